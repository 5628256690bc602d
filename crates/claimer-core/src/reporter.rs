use crate::error::AppError;
use crate::models::{Outcome, SourceKind};

/// Events emitted during a run for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    DiscoveryStarted,
    DiscoverySkipped,
    PassStarted {
        pass: usize,
        targets: usize,
    },
    SourceStarted {
        index: usize,
        total: usize,
        url: &'a str,
        kind: SourceKind,
    },
    SourceSkipped {
        url: &'a str,
        error: &'a AppError,
    },
    SourceHarvested {
        url: &'a str,
        listings: usize,
        more: usize,
    },
    DiscoveryFinished {
        passes: usize,
        listings: usize,
        pending: usize,
    },
    ClaimStarted {
        pending: usize,
    },
    ListingStarted {
        index: usize,
        total: usize,
        known: usize,
        url: &'a str,
    },
    ListingClassified {
        url: &'a str,
        outcome: Outcome,
    },
    ListingFailed {
        url: &'a str,
        error: &'a AppError,
        skipped: bool,
    },
    ClaimFinished {
        classified: usize,
        failed: usize,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::DiscoveryStarted => {
                tracing::info!("Reloading listing urls from the internet");
            }
            RunEvent::DiscoverySkipped => {
                tracing::info!(
                    "Using listing urls saved in the history file; \
                     pass --recheck and/or --recheck-groups to reload them"
                );
            }
            RunEvent::PassStarted { pass, targets } => {
                if pass == 1 {
                    tracing::info!(%targets, "Getting links from sources");
                } else {
                    tracing::info!(
                        %pass,
                        %targets,
                        "Getting links from newly discovered sales/collections"
                    );
                }
            }
            RunEvent::SourceStarted {
                index,
                total,
                url,
                kind,
            } => {
                tracing::info!(%url, %kind, "{index}/{total} getting listings");
            }
            RunEvent::SourceSkipped { url, error } => {
                tracing::warn!(%url, %error, "Skipping source");
            }
            RunEvent::SourceHarvested {
                url,
                listings,
                more,
            } => {
                tracing::debug!(%url, %listings, %more, "Source harvested");
            }
            RunEvent::DiscoveryFinished {
                passes,
                listings,
                pending,
            } => {
                tracing::info!(%passes, %listings, %pending, "Discovery finished");
            }
            RunEvent::ClaimStarted { pending } => {
                tracing::info!(%pending, "Classifying listings");
            }
            RunEvent::ListingStarted {
                index,
                total,
                known,
                url,
            } => {
                tracing::info!(%url, "{index}/{total} ({known})");
            }
            RunEvent::ListingClassified { url, outcome } => {
                tracing::info!(%url, %outcome, "Listing classified");
            }
            RunEvent::ListingFailed {
                url,
                error,
                skipped,
            } => {
                if skipped {
                    tracing::warn!(%url, %error, "Unknown error, skipping listing");
                } else {
                    tracing::error!(%url, %error, "Listing failed");
                }
            }
            RunEvent::ClaimFinished { classified, failed } => {
                tracing::info!(%classified, %failed, "Classification finished");
            }
        }
    }
}
