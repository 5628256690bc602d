//! Run sequencing: discovery, then classification of every unclassified
//! listing through one rendering session.

use tokio_util::sync::CancellationToken;

use crate::classify::Classifier;
use crate::config::RunConfig;
use crate::discovery::{Discovery, DiscoveryPlan, DiscoveryStats};
use crate::error::AppError;
use crate::history::PersistentHistory;
use crate::models::Outcome;
use crate::patterns::SourcePatterns;
use crate::reporter::{RunEvent, RunReporter};
use crate::throttle::{Pacer, ThrottleConfig};
use crate::traits::{Fetcher, LoginHandoff, Renderer, RendererLauncher};

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// `None` when the stored listing URLs were reused.
    pub discovery: Option<DiscoveryStats>,
    pub classified: usize,
    pub failed: usize,
    pub renderer_launched: bool,
}

/// Owns the collaborators of a run and sequences them.
pub struct Orchestrator<F: Fetcher, L: RendererLauncher, H: LoginHandoff> {
    config: RunConfig,
    patterns: SourcePatterns,
    discovery: Discovery<F>,
    classifier: Classifier,
    claim_pacer: Pacer,
    launcher: L,
    login: H,
}

impl<F, L, H> Orchestrator<F, L, H>
where
    F: Fetcher,
    L: RendererLauncher,
    H: LoginHandoff,
{
    pub fn new(config: RunConfig, fetcher: F, launcher: L, login: H) -> Self {
        let patterns = SourcePatterns::default();
        let discovery = Discovery::new(
            fetcher,
            patterns.clone(),
            Pacer::new(ThrottleConfig::new(config.page_delay)),
            config.page_cap,
        );
        let classifier =
            Classifier::new(patterns.clone()).with_window_settle(config.window_settle);
        Self {
            claim_pacer: Pacer::new(ThrottleConfig::new(config.claim_delay)),
            config,
            patterns,
            discovery,
            classifier,
            launcher,
            login,
        }
    }

    pub fn patterns(&self) -> &SourcePatterns {
        &self.patterns
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run discovery (when needed) and classify every unclassified listing.
    ///
    /// The store is updated in place as results come in. Writing it back is
    /// left to the caller so that it happens on every exit path.
    pub async fn run<R: RunReporter>(
        &self,
        store: &mut PersistentHistory,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<RunReport, AppError> {
        let mut report = RunReport {
            discovery: self.discover(store, cancel, reporter).await?,
            ..RunReport::default()
        };
        if report.discovery.is_some() {
            store.flush()?;
        }

        let pending = store.history().unclassified();
        reporter.report(RunEvent::ClaimStarted {
            pending: pending.len(),
        });
        if pending.is_empty() {
            reporter.report(RunEvent::ClaimFinished {
                classified: 0,
                failed: 0,
            });
            return Ok(report);
        }

        let renderer = self.launcher.launch().await?;
        report.renderer_launched = true;
        let result = self
            .classify_all(&renderer, store, &pending, cancel, reporter, &mut report)
            .await;
        if let Err(e) = renderer.close().await {
            tracing::warn!(error = %e, "Failed to close the rendering session");
        }
        reporter.report(RunEvent::ClaimFinished {
            classified: report.classified,
            failed: report.failed,
        });
        result.map(|()| report)
    }

    async fn discover<R: RunReporter>(
        &self,
        store: &mut PersistentHistory,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<Option<DiscoveryStats>, AppError> {
        let recheck_sources = !store.history().sources_checked || self.config.recheck_sources;
        let has_pending = !store.history().pending_groups(&self.patterns).is_empty();
        if !(recheck_sources || has_pending || self.config.recheck_groups) {
            reporter.report(RunEvent::DiscoverySkipped);
            return Ok(None);
        }

        reporter.report(RunEvent::DiscoveryStarted);
        let plan = DiscoveryPlan {
            sources: &self.config.sources,
            recheck_sources,
            recheck_groups: self.config.recheck_groups,
        };
        let stats = self
            .discovery
            .discover(store.history_mut(), plan, cancel, reporter)
            .await?;
        if recheck_sources {
            store.history_mut().sources_checked = true;
        }
        Ok(Some(stats))
    }

    async fn classify_all<Rd: Renderer, R: RunReporter>(
        &self,
        renderer: &Rd,
        store: &mut PersistentHistory,
        pending: &[String],
        cancel: &CancellationToken,
        reporter: &R,
        report: &mut RunReport,
    ) -> Result<(), AppError> {
        renderer.navigate(&self.config.login_url).await?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            result = self.login.wait_for_login(&self.config.login_url) => result?,
        }

        let total = pending.len();
        for (i, url) in pending.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            reporter.report(RunEvent::ListingStarted {
                index: i + 1,
                total,
                known: store.history().urls.len(),
                url,
            });

            match self.classify_one(url, renderer, cancel).await {
                Ok(outcome) => {
                    store.history_mut().record_classification(url, outcome);
                    reporter.report(RunEvent::ListingClassified { url, outcome });
                    report.classified += 1;
                }
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(error) => {
                    store.history_mut().record_failure(url);
                    report.failed += 1;
                    let skipped = error.is_per_listing() && self.config.continue_on_failure;
                    reporter.report(RunEvent::ListingFailed {
                        url,
                        error: &error,
                        skipped,
                    });
                    if !skipped {
                        return Err(error);
                    }
                }
            }

            self.claim_pacer.pause(cancel).await?;
        }
        Ok(())
    }

    async fn classify_one<Rd: Renderer>(
        &self,
        url: &str,
        renderer: &Rd,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = self.classifier.classify(url, renderer) => result,
        }
    }
}
