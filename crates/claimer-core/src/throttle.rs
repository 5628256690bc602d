//! Politeness pauses between page fetches and listing classifications.
//!
//! Every group page, thread chain, and classified listing is followed by a
//! fixed pause. Requests are never pipelined: the next fetch starts only
//! after the pause for the previous one has elapsed.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use claimer_core::throttle::{Pacer, ThrottleConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), claimer_core::AppError> {
//! let pacer = Pacer::new(ThrottleConfig::new(Duration::from_secs(15)));
//! let cancel = CancellationToken::new();
//! pacer.pause(&cancel).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::AppError;

/// Configuration for a [`Pacer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Fixed pause after each request.
    pub delay: Duration,
}

impl ThrottleConfig {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Default for ThrottleConfig {
    /// 15 seconds.
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

/// Sleeps for the configured pause, waking early only on cancellation.
#[derive(Debug, Clone)]
pub struct Pacer {
    config: ThrottleConfig,
}

impl Pacer {
    pub fn new(config: ThrottleConfig) -> Self {
        Self { config }
    }

    /// Pause, or return [`AppError::Cancelled`] if `cancel` fires first.
    pub async fn pause(&self, cancel: &CancellationToken) -> Result<(), AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        let wait = self.config.delay;
        if wait.is_zero() {
            return Ok(());
        }
        tracing::debug!(sleep_ms = %wait.as_millis(), "Pausing");
        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}
