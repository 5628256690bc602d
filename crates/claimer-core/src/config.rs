use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

/// Sources checked when none are configured.
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://old.reddit.com/r/FreeGameFindings/comments/i4ywei/itchio_mega_thread_7/",
    "https://old.reddit.com/r/FreeGameFindings/comments/ipp4xn/itchio_mega_thread_8/",
];

pub const DEFAULT_USER_AGENT: &str = "ClaimItch/0.11";
pub const DEFAULT_LOGIN_URL: &str = "https://itch.io/login";

/// Settings for one run, built once at startup and passed down.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sources: Vec<String>,
    pub history_file: PathBuf,
    /// Reload listing links from the configured sources.
    pub recheck_sources: bool,
    /// Reload listing links from already-checked groups.
    pub recheck_groups: bool,
    /// Record per-listing parsing failures and keep going instead of aborting.
    pub continue_on_failure: bool,
    /// Pause after every group page or thread chain fetch.
    pub page_delay: Duration,
    /// Pause after every listing classification.
    pub claim_delay: Duration,
    /// Pause before looking for a newly opened download window.
    pub window_settle: Duration,
    pub page_cap: Option<u32>,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub login_url: String,
}

impl RunConfig {
    pub fn new(history_file: impl Into<PathBuf>) -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            history_file: history_file.into(),
            recheck_sources: false,
            recheck_groups: false,
            continue_on_failure: false,
            page_delay: Duration::from_secs(15),
            claim_delay: Duration::from_secs(15),
            window_settle: Duration::from_secs(1),
            page_cap: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }

    /// Replace the default sources; an empty list keeps the defaults.
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        if !sources.is_empty() {
            self.sources = sources;
        }
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::ConfigError("user agent must not be empty".into()));
        }
        if self.page_cap == Some(0) {
            return Err(AppError::ConfigError("page cap must be at least 1".into()));
        }
        if self.history_file.as_os_str().is_empty() {
            return Err(AppError::ConfigError("history file path is empty".into()));
        }
        Ok(())
    }
}

/// `<program>.history.json`, derived from the program's file stem.
pub fn default_history_file(program: &Path) -> PathBuf {
    let stem = program
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("claimer");
    PathBuf::from(format!("{stem}.history.json"))
}
