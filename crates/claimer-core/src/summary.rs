//! End-of-run report over the stored history.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::history::History;
use crate::patterns::SourcePatterns;

/// Snapshot of the history worth showing to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    path: PathBuf,
    stats: Option<SummaryStats>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SummaryStats {
    sources: usize,
    discovered: usize,
    claimed: usize,
    unclassified: usize,
    pending_groups: usize,
    checked_groups: usize,
    pending_listings: usize,
    removed: usize,
    web: Vec<String>,
    dl_only: Vec<String>,
    always_free: usize,
    downloaded: usize,
    dl_only_old: usize,
    buy: usize,
    error: Vec<String>,
}

impl Summary {
    /// Build the report. When the history file is absent only its path is
    /// reported.
    pub fn from_history(
        path: &Path,
        path_exists: bool,
        history: &History,
        patterns: &SourcePatterns,
        source_count: usize,
    ) -> Self {
        let stats = path_exists.then(|| SummaryStats {
            sources: source_count,
            discovered: history.urls.len(),
            claimed: history.claimed.len(),
            unclassified: history.unclassified().len(),
            pending_groups: history.pending_groups(patterns).len(),
            checked_groups: history.checked_groups.len(),
            pending_listings: history.pending_listings(patterns).len(),
            removed: history.removed.len(),
            web: history.web.iter().cloned().collect(),
            dl_only: history.dl_only.iter().cloned().collect(),
            always_free: history.always_free.len(),
            downloaded: history.downloaded.len(),
            dl_only_old: history.dl_only_old.len(),
            buy: history.buy.len(),
            error: history.error.iter().cloned().collect(),
        });
        Self {
            path: path.to_path_buf(),
            stats,
        }
    }

    /// Listings still waiting for classification, or 0 without a history.
    pub fn unclassified(&self) -> usize {
        self.stats.as_ref().map_or(0, |s| s.unclassified)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, urls: &[String]) -> fmt::Result {
    for url in urls {
        writeln!(f, "  {url}")?;
    }
    Ok(())
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SUMMARY")?;
        let Some(s) = &self.stats else {
            return writeln!(f, "No history is stored in {}", self.path.display());
        };

        writeln!(f, "History stored in {}", self.path.display())?;
        writeln!(f)?;
        writeln!(f, "{} configured sources (pass --recheck to reload them)", s.sources)?;
        writeln!(f, "{} listings discovered", s.discovered)?;
        writeln!(f, "{} listings claimed", s.claimed)?;
        writeln!(f, "{} listings to be claimed on the next run", s.unclassified)?;
        writeln!(f)?;

        writeln!(
            f,
            "{} discovered sales / collections to check on the next run",
            s.pending_groups
        )?;
        writeln!(
            f,
            "{} sales / collections already checked (pass --recheck-groups to reload them)",
            s.checked_groups
        )?;
        writeln!(
            f,
            "{} listings connected to sales that may not have been checked",
            s.pending_listings
        )?;
        writeln!(f, "{} listings removed or invalid", s.removed)?;
        writeln!(f)?;

        writeln!(f, "{} listings can only be played online:", s.web.len())?;
        write_list(f, &s.web)?;
        writeln!(f)?;

        writeln!(f, "{} listings can only be downloaded manually:", s.dl_only.len())?;
        write_list(f, &s.dl_only)?;
        writeln!(f, "{} downloadable listings are always free (not listed)", s.always_free)?;
        writeln!(
            f,
            "{} listings marked as downloaded \
             (move them from 'dl_only' to 'downloaded' in the history file)",
            s.downloaded
        )?;
        writeln!(f, "{} downloadable listings skipped ('dl_only_old')", s.dl_only_old)?;
        writeln!(f)?;

        writeln!(f, "{} listings are not free", s.buy)?;
        writeln!(f)?;

        writeln!(
            f,
            "{} listings failed classification (some may be resolved since):",
            s.error.len()
        )?;
        write_list(f, &s.error)
    }
}
