use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use claimer_core::{AppError, Fetcher, Region, Renderer, RendererLauncher, RunConfig, WindowHandle};

/// Fetcher serving fixed bodies; anything else is a 404.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    bodies: Arc<HashMap<String, String>>,
    hits: Arc<Mutex<usize>>,
}

impl StaticFetcher {
    pub fn new(bodies: &[(&str, String)]) -> Self {
        Self {
            bodies: Arc::new(
                bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.clone()))
                    .collect(),
            ),
            hits: Arc::new(Mutex::new(0)),
        }
    }

    pub fn hits(&self) -> usize {
        *self.hits.lock().unwrap()
    }
}

impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        *self.hits.lock().unwrap() += 1;
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::NotFound(url.to_string()))
    }
}

/// Renderer where every listing shows a paid purchase control.
#[derive(Clone, Default)]
pub struct StoreFrontRenderer {
    visited: Arc<Mutex<Vec<String>>>,
}

impl StoreFrontRenderer {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Renderer for StoreFrontRenderer {
    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn find_region(&self, selector: &str) -> Result<Option<Region>, AppError> {
        Ok((selector == claimer_core::classify::BUY_ROW_BUTTON).then(|| Region {
            selector: selector.to_string(),
            text: "Buy Now $2.00".to_string(),
        }))
    }

    async fn activate(&self, _region: &Region) -> Result<(), AppError> {
        Ok(())
    }

    async fn current_window(&self) -> Result<WindowHandle, AppError> {
        Ok("main".to_string())
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>, AppError> {
        Ok(vec!["main".to_string()])
    }

    async fn switch_window(&self, _handle: &WindowHandle) -> Result<(), AppError> {
        Ok(())
    }

    async fn close_window(&self, _handle: &WindowHandle) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct StoreFrontLauncher {
    pub renderer: StoreFrontRenderer,
}

impl RendererLauncher for StoreFrontLauncher {
    type Renderer = StoreFrontRenderer;

    async fn launch(&self) -> Result<StoreFrontRenderer, AppError> {
        Ok(self.renderer.clone())
    }
}

pub fn sale_page(listings: &[&str]) -> String {
    let cells: String = listings
        .iter()
        .map(|href| format!("<div class=\"game_cell\"><a href=\"{href}\">game</a></div>"))
        .collect();
    format!("<html><body>{cells}</body></html>")
}

pub fn quick_config(path: &std::path::Path, sources: &[&str]) -> RunConfig {
    let mut config =
        RunConfig::new(path).with_sources(sources.iter().map(|s| s.to_string()).collect());
    config.page_delay = Duration::ZERO;
    config.claim_delay = Duration::ZERO;
    config.window_settle = Duration::ZERO;
    config
}
