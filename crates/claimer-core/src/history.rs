//! Persisted classification history.
//!
//! The history is a JSON object of URL sets, one per category. Listings in
//! the resolved partition (`claimed`, `dl_only`, `dl_only_old`,
//! `always_free`, `web`, `buy`, `removed`, `downloaded`) belong to at most one
//! of those sets; `error` and `old_error` sit beside the partition.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::AppError;
use crate::models::{Classification, Outcome};
use crate::patterns::SourcePatterns;

/// In-memory history, loaded at start and written back at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct History {
    /// Every discovered listing URL.
    pub urls: BTreeSet<String>,
    pub claimed: BTreeSet<String>,
    /// Groups still to traverse, plus listings tied to further promotions.
    pub has_more: BTreeSet<String>,
    /// Groups already traversed.
    pub checked_groups: BTreeSet<String>,
    pub dl_only: BTreeSet<String>,
    /// Downloadable listings the user chose to skip (edited by hand).
    pub dl_only_old: BTreeSet<String>,
    pub always_free: BTreeSet<String>,
    pub web: BTreeSet<String>,
    /// Listings the user downloaded (edited by hand).
    pub downloaded: BTreeSet<String>,
    pub buy: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub error: BTreeSet<String>,
    pub old_error: BTreeSet<String>,
    /// Set once every configured source was crawled without error.
    pub sources_checked: bool,
}

impl History {
    /// Load a history file; a missing file yields an empty history.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        match std::fs::read_to_string(path) {
            Ok(data) => {
                let history: Self = serde_json::from_str(&data).map_err(|e| {
                    AppError::StoreError(format!("Invalid history file {}: {e}", path.display()))
                })?;
                tracing::info!(path = %path.display(), "Loaded history");
                for (key, count) in history.counts() {
                    tracing::debug!(%key, %count, "History category");
                }
                Ok(history)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "New history file will be created");
                Ok(Self::default())
            }
            Err(e) => Err(AppError::StoreError(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Atomically write the history: temp file in the same directory, then rename.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        tracing::info!(path = %path.display(), "Writing history");
        let data = serde_json::to_string_pretty(self)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let store_err = |e: io::Error| {
            AppError::StoreError(format!("Failed to write {}: {e}", path.display()))
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(store_err)?;
        tmp.write_all(data.as_bytes()).map_err(store_err)?;
        tmp.write_all(b"\n").map_err(store_err)?;
        tmp.flush().map_err(store_err)?;
        tmp.as_file_mut().sync_all().map_err(store_err)?;
        tmp.persist(path).map_err(|e| store_err(e.error))?;
        Ok(())
    }

    pub fn resolved(&self, classification: Classification) -> &BTreeSet<String> {
        match classification {
            Classification::Claimed => &self.claimed,
            Classification::DlOnly => &self.dl_only,
            Classification::DlOnlyOld => &self.dl_only_old,
            Classification::AlwaysFree => &self.always_free,
            Classification::Web => &self.web,
            Classification::Buy => &self.buy,
            Classification::Removed => &self.removed,
            Classification::Downloaded => &self.downloaded,
        }
    }

    fn resolved_mut(&mut self, classification: Classification) -> &mut BTreeSet<String> {
        match classification {
            Classification::Claimed => &mut self.claimed,
            Classification::DlOnly => &mut self.dl_only,
            Classification::DlOnlyOld => &mut self.dl_only_old,
            Classification::AlwaysFree => &mut self.always_free,
            Classification::Web => &mut self.web,
            Classification::Buy => &mut self.buy,
            Classification::Removed => &mut self.removed,
            Classification::Downloaded => &mut self.downloaded,
        }
    }

    /// The resolved category of `url`, if any.
    pub fn resolution(&self, url: &str) -> Option<Classification> {
        Classification::ALL
            .into_iter()
            .find(|c| self.resolved(*c).contains(url))
    }

    pub fn is_resolved(&self, url: &str) -> bool {
        self.resolution(url).is_some()
    }

    /// Discovered listings outside the resolved partition, in stable order.
    pub fn unclassified(&self) -> Vec<String> {
        self.urls
            .iter()
            .filter(|url| !self.is_resolved(url))
            .cloned()
            .collect()
    }

    /// Entries of `has_more` that are groups.
    pub fn pending_groups(&self, patterns: &SourcePatterns) -> BTreeSet<String> {
        self.has_more
            .iter()
            .filter(|url| patterns.is_group(url))
            .cloned()
            .collect()
    }

    /// Entries of `has_more` that are listings rather than groups.
    pub fn pending_listings(&self, patterns: &SourcePatterns) -> BTreeSet<String> {
        self.has_more
            .iter()
            .filter(|url| patterns.is_listing(url))
            .cloned()
            .collect()
    }

    pub fn record_discovered<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls.extend(urls.into_iter().map(Into::into));
    }

    /// Add to `has_more`; URLs already checked are not pending again.
    pub fn record_pending_groups<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            let url = url.into();
            if !self.checked_groups.contains(&url) {
                self.has_more.insert(url);
            }
        }
    }

    /// Move traversed groups into `checked_groups` and out of `has_more`.
    pub fn mark_groups_checked<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.checked_groups.extend(urls.into_iter().map(Into::into));
        let checked = &self.checked_groups;
        self.has_more.retain(|url| !checked.contains(url));
    }

    /// Record a classification outcome for `url`.
    ///
    /// The listing leaves any other resolved category, a `has_more` outcome
    /// also queues the URL in `has_more`, and a prior `error` tag moves to
    /// `old_error`.
    pub fn record_classification(&mut self, url: &str, outcome: Outcome) {
        for classification in Classification::ALL {
            if classification != outcome.classification {
                self.resolved_mut(classification).remove(url);
            }
        }
        self.resolved_mut(outcome.classification)
            .insert(url.to_string());
        if outcome.has_more {
            self.has_more.insert(url.to_string());
        }
        if self.error.remove(url) {
            self.old_error.insert(url.to_string());
        }
    }

    /// Tag `url` as having broken classification.
    pub fn record_failure(&mut self, url: &str) {
        self.error.insert(url.to_string());
    }

    /// Sizes of every category, for logging.
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts = vec![
            ("urls", self.urls.len()),
            ("has_more", self.has_more.len()),
            ("checked_groups", self.checked_groups.len()),
        ];
        counts.extend(
            Classification::ALL
                .into_iter()
                .map(|c| (c.key(), self.resolved(c).len())),
        );
        counts.push(("error", self.error.len()));
        counts.push(("old_error", self.old_error.len()));
        counts
    }
}

/// A history bound to its file, flushed on every exit path.
///
/// [`PersistentHistory::close`] writes explicitly and reports failures. If the
/// value is dropped without `close` (early return, unwinding), `Drop` writes
/// the last in-memory state and logs any failure.
pub struct PersistentHistory {
    path: PathBuf,
    history: History,
    existed: bool,
    closed: bool,
}

impl PersistentHistory {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let existed = path.exists();
        let history = History::load(&path)?;
        Ok(Self {
            path,
            history,
            existed,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the history file was present when opened.
    pub fn existed(&self) -> bool {
        self.existed
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Write the current state without closing.
    pub fn flush(&self) -> Result<(), AppError> {
        self.history.save(&self.path)
    }

    /// Write the final state and consume the handle.
    pub fn close(mut self) -> Result<History, AppError> {
        self.closed = true;
        self.history.save(&self.path)?;
        Ok(std::mem::take(&mut self.history))
    }
}

impl Drop for PersistentHistory {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.history.save(&self.path) {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to flush history");
        }
    }
}
