use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use claimer_client::{BrowserOptions, ChromiumLauncher, ReqwestFetcher};
use claimer_core::config::{DEFAULT_LOGIN_URL, DEFAULT_USER_AGENT};
use claimer_core::traits::LoginHandoff;
use claimer_core::{
    AppError, History, Orchestrator, PersistentHistory, RunConfig, SourcePatterns, Summary,
    TracingRunReporter, default_history_file,
};

#[derive(Parser)]
#[command(
    name = "claimer",
    version,
    about = "Claim free itch.io listings found in sales, collections, and reddit threads"
)]
struct Cli {
    /// History file (defaults to <program>.history.json)
    #[arg(env = "CLAIMER_HISTORY_FILE")]
    history_file: Option<PathBuf>,

    /// Print a summary of the history file and exit
    #[arg(long)]
    show_history: bool,

    /// Reload listing links from the configured sources
    #[arg(long, env = "CLAIMER_RECHECK")]
    recheck: bool,

    /// Reload listing links from sales / collections already checked
    #[arg(long, env = "CLAIMER_RECHECK_GROUPS")]
    recheck_groups: bool,

    /// Record listings that fail to classify and continue with the next one
    #[arg(long, visible_alias = "continue-on-failure", env = "CLAIMER_IGNORE")]
    ignore: bool,

    /// Source to get listing links from (repeatable; replaces the defaults)
    #[arg(long = "source", env = "CLAIMER_SOURCES", value_delimiter = ',')]
    sources: Vec<String>,

    /// Show images in the browser
    #[arg(long, env = "CLAIMER_ENABLE_IMAGES")]
    enable_images: bool,

    /// Mute the browser
    #[arg(long, env = "CLAIMER_MUTE")]
    mute: bool,

    /// Run the browser without a window (the login step needs a window)
    #[arg(long, env = "CLAIMER_HEADLESS")]
    headless: bool,

    /// Seconds to wait after every sale / collection page or thread chain
    #[arg(long, env = "CLAIMER_PAGE_DELAY", default_value_t = 15)]
    page_delay: u64,

    /// Seconds to wait after every listing
    #[arg(long, env = "CLAIMER_CLAIM_DELAY", default_value_t = 15)]
    claim_delay: u64,

    /// Milliseconds to wait for a download page opened in a new window
    #[arg(long, env = "CLAIMER_WINDOW_SETTLE_MS", default_value_t = 1000)]
    window_settle_ms: u64,

    /// Milliseconds a click waits for the page it may load
    #[arg(long, env = "CLAIMER_CLICK_SETTLE_MS", default_value_t = 3000)]
    click_settle_ms: u64,

    /// Seconds a page lookup keeps waiting for an element to appear
    #[arg(long, env = "CLAIMER_ELEMENT_WAIT", default_value_t = 10)]
    element_wait: u64,

    /// Stop reading a collection after this many pages
    #[arg(long, env = "CLAIMER_PAGE_CAP")]
    page_cap: Option<u32>,

    /// User-Agent for page fetches
    #[arg(long, env = "CLAIMER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "CLAIMER_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Page opened for the manual login
    #[arg(long, env = "CLAIMER_LOGIN_URL", default_value = DEFAULT_LOGIN_URL)]
    login_url: String,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let history_file = self.history_file.clone().unwrap_or_else(|| {
            let program = std::env::args_os().next().map(PathBuf::from).unwrap_or_default();
            default_history_file(&program)
        });
        let mut config = RunConfig::new(history_file).with_sources(self.sources.clone());
        config.recheck_sources = self.recheck;
        config.recheck_groups = self.recheck_groups;
        config.continue_on_failure = self.ignore;
        config.page_delay = Duration::from_secs(self.page_delay);
        config.claim_delay = Duration::from_secs(self.claim_delay);
        config.window_settle = Duration::from_millis(self.window_settle_ms);
        config.page_cap = self.page_cap;
        config.user_agent = self.user_agent.clone();
        config.request_timeout = Duration::from_secs(self.timeout);
        config.login_url = self.login_url.clone();
        config
    }

    fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            headless: self.headless,
            enable_images: self.enable_images,
            mute: self.mute,
            element_wait: Duration::from_secs(self.element_wait),
            navigation_timeout: Duration::from_secs(self.timeout),
            click_settle: Duration::from_millis(self.click_settle_ms),
        }
    }
}

/// Waits for the user to confirm the login on stdin.
struct StdinLogin;

impl LoginHandoff for StdinLogin {
    async fn wait_for_login(&self, login_url: &str) -> Result<(), AppError> {
        println!("A browser window was opened at {login_url}");
        println!("Log in, then press Enter to continue");
        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| AppError::ConfigError(format!("Failed to read from stdin: {e}")))?;
        if read == 0 {
            tracing::warn!("stdin closed, continuing without login confirmation");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("claimer=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.run_config();
    config.validate().context("Invalid configuration")?;

    if cli.show_history {
        let history = History::load(&config.history_file).context("Failed to load history")?;
        print_summary(&config, &history);
        return Ok(());
    }

    cmd_run(config, cli.browser_options()).await
}

async fn cmd_run(config: RunConfig, browser: BrowserOptions) -> Result<()> {
    let mut store = PersistentHistory::open(&config.history_file)
        .with_context(|| format!("Failed to open {}", config.history_file.display()))?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, saving history");
            interrupt.cancel();
        }
    });

    let fetcher = ReqwestFetcher::with_settings(&config.user_agent, config.request_timeout)
        .context("Failed to create HTTP client")?;
    let orchestrator = Orchestrator::new(
        config.clone(),
        fetcher,
        ChromiumLauncher::new(browser),
        StdinLogin,
    );

    let result = orchestrator
        .run(&mut store, &cancel, &TracingRunReporter)
        .await;
    let saved = store.close();

    match &saved {
        Ok(history) => print_summary(&config, history),
        Err(e) => tracing::error!(error = %e, "Failed to save history"),
    }

    let report = result.context("Run aborted")?;
    saved.context("Failed to save history")?;
    tracing::info!(
        classified = report.classified,
        failed = report.failed,
        "Done"
    );
    Ok(())
}

fn print_summary(config: &RunConfig, history: &History) {
    let path: &Path = &config.history_file;
    let summary = Summary::from_history(
        path,
        path.exists(),
        history,
        &SourcePatterns::default(),
        config.sources.len(),
    );
    println!("\n{summary}");
}
