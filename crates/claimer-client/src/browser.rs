use std::path::PathBuf;
use std::time::{Duration, Instant};

use chromiumoxide::{Browser, BrowserConfig, Page};
use claimer_core::error::AppError;
use claimer_core::traits::{Region, Renderer, RendererLauncher, WindowHandle};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Options for the Chromium session that classifies listings.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run without a visible window. Off by default since login is manual.
    pub headless: bool,
    pub enable_images: bool,
    pub mute: bool,
    /// How long a region lookup keeps polling before reporting it absent.
    pub element_wait: Duration,
    pub navigation_timeout: Duration,
    /// How long a click waits for the navigation it may trigger.
    pub click_settle: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            enable_images: false,
            mute: false,
            element_wait: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
            click_settle: Duration::from_secs(3),
        }
    }
}

/// Launches one Chromium process per run.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    options: BrowserOptions,
}

impl ChromiumLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// On systems where Chromium is installed via **snap**, the wrapper at
    /// `/snap/bin/chromium` strips unknown CLI flags. We look for the real
    /// binary inside the snap first, then fall back to well-known system
    /// paths. If nothing is found `chromiumoxide` does its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        let candidates: &[&str] = &[
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }

    fn config(&self) -> Result<BrowserConfig, AppError> {
        let mut builder = BrowserConfig::builder();
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }
        if !self.options.enable_images {
            builder = builder.arg("--blink-settings=imagesEnabled=false");
        }
        if self.options.mute {
            builder = builder.arg("--mute-audio");
        }
        builder
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::RendererError(format!("Browser config error: {e}")))
    }
}

impl RendererLauncher for ChromiumLauncher {
    type Renderer = ChromiumRenderer;

    async fn launch(&self) -> Result<ChromiumRenderer, AppError> {
        let (browser, mut handler) = Browser::launch(self.config()?)
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to open a tab: {e}")))?;
        tracing::info!(headless = self.options.headless, "Browser launched");

        Ok(ChromiumRenderer {
            browser: Mutex::new(browser),
            current: Mutex::new(page),
            handler_task,
            options: self.options.clone(),
        })
    }
}

#[derive(Deserialize)]
struct RegionQuery {
    found: bool,
    #[serde(default)]
    text: String,
}

/// A live Chromium session driven over the DevTools protocol.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    current: Mutex<Page>,
    handler_task: JoinHandle<()>,
    options: BrowserOptions,
}

impl ChromiumRenderer {
    async fn page(&self) -> Page {
        self.current.lock().await.clone()
    }

    async fn pages(&self) -> Result<Vec<Page>, AppError> {
        self.browser
            .lock()
            .await
            .pages()
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to list tabs: {e}")))
    }

    async fn find_page(&self, handle: &WindowHandle) -> Result<Page, AppError> {
        self.pages()
            .await?
            .into_iter()
            .find(|p| p.target_id().inner() == handle)
            .ok_or_else(|| AppError::RendererError(format!("No such window: {handle}")))
    }

    async fn query_region(page: &Page, selector: &str) -> Result<RegionQuery, AppError> {
        let quoted = serde_json::to_string(selector)?;
        let script = format!(
            "(() => {{ const el = document.querySelector({quoted}); \
             return el ? {{ found: true, text: el.textContent }} : {{ found: false }}; }})()"
        );
        page.evaluate(script)
            .await
            .map_err(|e| AppError::RendererError(format!("Query {selector} failed: {e}")))?
            .into_value::<RegionQuery>()
            .map_err(AppError::from)
    }
}

impl Renderer for ChromiumRenderer {
    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        let page = self.page().await;
        tokio::time::timeout(self.options.navigation_timeout, page.goto(url))
            .await
            .map_err(|_| AppError::Timeout(self.options.navigation_timeout.as_secs()))?
            .map_err(|e| AppError::RendererError(format!("Failed to navigate to {url}: {e}")))?;
        Ok(())
    }

    async fn find_region(&self, selector: &str) -> Result<Option<Region>, AppError> {
        let page = self.page().await;
        let deadline = Instant::now() + self.options.element_wait;
        loop {
            let query = Self::query_region(&page, selector).await?;
            if query.found {
                return Ok(Some(Region {
                    selector: selector.to_string(),
                    text: query.text,
                }));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn activate(&self, region: &Region) -> Result<(), AppError> {
        let page = self.page().await;
        let element = page.find_element(region.selector.as_str()).await.map_err(|e| {
            AppError::RendererError(format!("Region {} disappeared: {e}", region.selector))
        })?;
        element.click().await.map_err(|e| {
            AppError::RendererError(format!("Click on {} failed: {e}", region.selector))
        })?;
        if tokio::time::timeout(self.options.click_settle, page.wait_for_navigation())
            .await
            .is_err()
        {
            tracing::debug!(selector = %region.selector, "No navigation after click");
        }
        Ok(())
    }

    async fn current_window(&self) -> Result<WindowHandle, AppError> {
        Ok(self.page().await.target_id().inner().clone())
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>, AppError> {
        Ok(self
            .pages()
            .await?
            .iter()
            .map(|p| p.target_id().inner().clone())
            .collect())
    }

    async fn switch_window(&self, handle: &WindowHandle) -> Result<(), AppError> {
        let page = self.find_page(handle).await?;
        page.bring_to_front()
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to focus {handle}: {e}")))?;
        *self.current.lock().await = page;
        Ok(())
    }

    async fn close_window(&self, handle: &WindowHandle) -> Result<(), AppError> {
        let page = self.find_page(handle).await?;
        page.close()
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to close {handle}: {e}")))
    }

    async fn close(&self) -> Result<(), AppError> {
        let mut browser = self.browser.lock().await;
        let closed = browser
            .close()
            .await
            .map_err(|e| AppError::RendererError(format!("Failed to close browser: {e}")));
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "Browser process already gone");
        }
        self.handler_task.abort();
        closed.map(|_| ())
    }
}
