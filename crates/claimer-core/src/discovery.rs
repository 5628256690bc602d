//! Fixed-point traversal over sources and discovered groups.
//!
//! Pass 1 targets the configured sources (when rechecking them), the
//! already-checked groups (when rechecking groups), and every pending group.
//! Later passes target only the groups that became pending. A traversed group
//! is moved to `checked_groups` and is never pending again, so the loop ends
//! once a pass uncovers no unchecked group.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::group::GroupCrawler;
use crate::history::History;
use crate::models::{Harvest, SourceKind};
use crate::patterns::SourcePatterns;
use crate::reporter::{RunEvent, RunReporter};
use crate::thread::ThreadCrawler;
use crate::throttle::Pacer;
use crate::traits::Fetcher;

/// What the first pass should revisit besides the pending groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryPlan<'a> {
    pub sources: &'a [String],
    pub recheck_sources: bool,
    pub recheck_groups: bool,
}

/// Totals of one discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    pub passes: usize,
    pub sources_visited: usize,
    pub sources_skipped: usize,
    pub new_listings: usize,
}

/// Routes each source to its extractor and expands groups to quiescence.
#[derive(Clone)]
pub struct Discovery<F: Fetcher> {
    patterns: SourcePatterns,
    groups: GroupCrawler<F>,
    threads: ThreadCrawler<F>,
}

impl<F: Fetcher> Discovery<F> {
    pub fn new(fetcher: F, patterns: SourcePatterns, pacer: Pacer, page_cap: Option<u32>) -> Self {
        Self {
            groups: GroupCrawler::new(fetcher.clone(), pacer.clone()).with_page_cap(page_cap),
            threads: ThreadCrawler::new(fetcher, pacer, patterns.clone()),
            patterns,
        }
    }

    /// Run the extractor matching the source's kind.
    pub async fn harvest(
        &self,
        url: &str,
        kind: SourceKind,
        cancel: &CancellationToken,
    ) -> Result<Harvest, AppError> {
        match kind {
            SourceKind::Collection => self.groups.crawl(url, false, cancel).await,
            SourceKind::Sale => self.groups.crawl(url, true, cancel).await,
            SourceKind::Thread => self.threads.crawl(url, cancel).await,
        }
    }

    /// Expand sources and groups until no unchecked group remains.
    ///
    /// Unsupported sources are reported and skipped. Any other failure stops
    /// discovery; the failing source contributes nothing, while sources
    /// harvested before it stay recorded.
    pub async fn discover<R: RunReporter>(
        &self,
        history: &mut History,
        plan: DiscoveryPlan<'_>,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<DiscoveryStats, AppError> {
        let mut stats = DiscoveryStats::default();
        let known_before = history.urls.len();

        loop {
            let mut targets: BTreeSet<String> = history.pending_groups(&self.patterns);
            if stats.passes == 0 {
                if plan.recheck_sources {
                    targets.extend(plan.sources.iter().cloned());
                }
                if plan.recheck_groups {
                    targets.extend(history.checked_groups.iter().cloned());
                }
            }
            if targets.is_empty() {
                break;
            }

            stats.passes += 1;
            reporter.report(RunEvent::PassStarted {
                pass: stats.passes,
                targets: targets.len(),
            });

            let total = targets.len();
            for (i, url) in targets.iter().enumerate() {
                let kind = match self.patterns.classify(url) {
                    Ok(kind) => kind,
                    Err(error) => {
                        reporter.report(RunEvent::SourceSkipped { url, error: &error });
                        stats.sources_skipped += 1;
                        continue;
                    }
                };
                reporter.report(RunEvent::SourceStarted {
                    index: i + 1,
                    total,
                    url,
                    kind,
                });

                let harvest = self.harvest(url, kind, cancel).await?;
                reporter.report(RunEvent::SourceHarvested {
                    url,
                    listings: harvest.listings.len(),
                    more: harvest.more.len(),
                });
                self.record(history, harvest);
                if self.patterns.is_group(url) {
                    history.mark_groups_checked([url.as_str()]);
                }
                stats.sources_visited += 1;
            }
        }

        stats.new_listings = history.urls.len() - known_before;
        reporter.report(RunEvent::DiscoveryFinished {
            passes: stats.passes,
            listings: history.urls.len(),
            pending: history.pending_groups(&self.patterns).len(),
        });
        Ok(stats)
    }

    /// Union a harvest into the history with listing URLs in canonical form.
    fn record(&self, history: &mut History, harvest: Harvest) {
        let listings: Vec<String> = harvest
            .listings
            .into_iter()
            .filter_map(|url| match self.patterns.canonical_listing(&url) {
                Ok(canonical) => Some(canonical),
                Err(_) => {
                    tracing::debug!(%url, "Ignoring link that is not a listing");
                    None
                }
            })
            .collect();
        let more: Vec<String> = harvest
            .more
            .into_iter()
            .map(|url| {
                if self.patterns.is_group(&url) {
                    url
                } else {
                    self.patterns.canonical_listing(&url).unwrap_or(url)
                }
            })
            .collect();
        history.record_discovered(listings);
        history.record_pending_groups(more);
    }
}
