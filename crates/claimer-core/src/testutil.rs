//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::error::AppError;
use crate::reporter::{RunEvent, RunReporter};
use crate::traits::{Fetcher, LoginHandoff, Region, Renderer, RendererLauncher, WindowHandle};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Route {
    Body(String),
    Status(u16),
}

/// Mock fetcher answering from a fixed route table.
///
/// Unrouted URLs answer 404.
#[derive(Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn routes() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Body(body.to_string()));
        self
    }

    pub fn status(self, url: &str, code: u16) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Status(code));
        self
    }

    /// Every URL fetched so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requests.lock().unwrap().push(url.to_string());
        let route = self.routes.lock().unwrap().get(url).cloned();
        match route {
            Some(Route::Body(body)) => Ok(body),
            Some(Route::Status(404)) | None => Err(AppError::NotFound(url.to_string())),
            Some(Route::Status(code)) => Err(AppError::HttpError(format!("HTTP {code} for {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Page fixtures
// ---------------------------------------------------------------------------

/// A group page with one cell per `(href, tied_to_another_group)`.
pub fn group_page(cells: &[(&str, bool)]) -> String {
    let mut html = String::from("<html><body><div class=\"game_grid_widget\">");
    for (href, tied) in cells {
        html.push_str("<div class=\"game_cell\">");
        html.push_str(&format!("<a class=\"title\" href=\"{href}\">game</a>"));
        if *tied {
            html.push_str(
                "<div class=\"blurb_outer\"><div class=\"blurb\">Also in a bundle</div></div>",
            );
        }
        html.push_str("</div>");
    }
    html.push_str("</div></body></html>");
    html
}

/// A thread chain response: one listing of posts, one of replies plus an
/// optional `more` stub naming `more_ids`.
pub fn thread_json(posts: &[&str], replies: &[&str], more_ids: &[&str]) -> String {
    let escape = |body: &&str| html_escape::encode_safe(*body).into_owned();
    let posts: Vec<_> = posts
        .iter()
        .map(|body| json!({"kind": "t3", "data": {"selftext_html": escape(body)}}))
        .collect();
    let mut replies: Vec<_> = replies
        .iter()
        .map(|body| json!({"kind": "t1", "data": {"body_html": escape(body)}}))
        .collect();
    if !more_ids.is_empty() {
        replies.push(json!({"kind": "more", "data": {"children": more_ids}}));
    }
    json!([
        {"kind": "Listing", "data": {"children": posts}},
        {"kind": "Listing", "data": {"children": replies}},
    ])
    .to_string()
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// A scripted page: region texts by selector, and where activating a
/// selector leads.
#[derive(Clone, Default)]
pub struct MockPage {
    regions: HashMap<String, String>,
    transitions: HashMap<String, (String, bool)>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, selector: &str, text: &str) -> Self {
        self.regions.insert(selector.to_string(), text.to_string());
        self
    }

    /// Activating `selector` loads `target`, in a new window if `new_window`.
    pub fn on_activate(mut self, selector: &str, target: &str, new_window: bool) -> Self {
        self.transitions
            .insert(selector.to_string(), (target.to_string(), new_window));
        self
    }
}

#[derive(Default)]
struct RendererState {
    pages: HashMap<String, MockPage>,
    /// Open windows and the URL each one shows.
    windows: Vec<(WindowHandle, String)>,
    current: WindowHandle,
    next_window: usize,
    navigations: Vec<String>,
    activations: Vec<String>,
    closed_windows: Vec<WindowHandle>,
    closed: bool,
    fail_navigation: Option<String>,
}

impl RendererState {
    fn open_window(&mut self, url: &str) -> WindowHandle {
        let handle = format!("window-{}", self.next_window);
        self.next_window += 1;
        self.windows.push((handle.clone(), url.to_string()));
        handle
    }

    fn current_url(&self) -> Option<&str> {
        self.windows
            .iter()
            .find(|(h, _)| *h == self.current)
            .map(|(_, url)| url.as_str())
    }

    fn set_current_url(&mut self, url: &str) -> Result<(), AppError> {
        let current = self.current.clone();
        let window = self
            .windows
            .iter_mut()
            .find(|(h, _)| *h == current)
            .ok_or_else(|| AppError::RendererError(format!("no such window: {current}")))?;
        window.1 = url.to_string();
        Ok(())
    }
}

/// Mock renderer serving scripted pages. Unknown pages have no regions.
#[derive(Clone)]
pub struct MockRenderer {
    state: Arc<Mutex<RendererState>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        let mut state = RendererState::default();
        state.current = state.open_window("about:blank");
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn page(self, url: &str, page: MockPage) -> Self {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), page);
        self
    }

    /// Open another window showing `url`, leaving the current one focused.
    pub fn with_window(self, url: &str) -> Self {
        self.state.lock().unwrap().open_window(url);
        self
    }

    /// Make navigation to `url` fail with a renderer error.
    pub fn failing_navigation(self, url: &str) -> Self {
        self.state.lock().unwrap().fail_navigation = Some(url.to_string());
        self
    }

    /// URLs passed to `navigate`, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    /// Selectors activated, in order.
    pub fn activations(&self) -> Vec<String> {
        self.state.lock().unwrap().activations.clone()
    }

    pub fn open_windows(&self) -> usize {
        self.state.lock().unwrap().windows.len()
    }

    pub fn closed_windows(&self) -> Vec<WindowHandle> {
        self.state.lock().unwrap().closed_windows.clone()
    }

    /// Whether the session was ended.
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MockRenderer {
    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        if state.fail_navigation.as_deref() == Some(url) {
            return Err(AppError::RendererError(format!("navigation to {url} failed")));
        }
        state.set_current_url(url)
    }

    async fn find_region(&self, selector: &str) -> Result<Option<Region>, AppError> {
        let state = self.state.lock().unwrap();
        let text = state
            .current_url()
            .and_then(|url| state.pages.get(url))
            .and_then(|page| page.regions.get(selector));
        Ok(text.map(|text| Region {
            selector: selector.to_string(),
            text: text.clone(),
        }))
    }

    async fn activate(&self, region: &Region) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.activations.push(region.selector.clone());
        let transition = state
            .current_url()
            .and_then(|url| state.pages.get(url))
            .and_then(|page| page.transitions.get(&region.selector))
            .cloned();
        match transition {
            Some((target, true)) => {
                state.open_window(&target);
                Ok(())
            }
            Some((target, false)) => state.set_current_url(&target),
            None => Ok(()),
        }
    }

    async fn current_window(&self) -> Result<WindowHandle, AppError> {
        Ok(self.state.lock().unwrap().current.clone())
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.windows.iter().map(|(h, _)| h.clone()).collect())
    }

    async fn switch_window(&self, handle: &WindowHandle) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if !state.windows.iter().any(|(h, _)| h == handle) {
            return Err(AppError::RendererError(format!("no such window: {handle}")));
        }
        state.current = handle.clone();
        Ok(())
    }

    async fn close_window(&self, handle: &WindowHandle) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.windows.retain(|(h, _)| h != handle);
        state.closed_windows.push(handle.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockLauncher / MockLogin
// ---------------------------------------------------------------------------

/// Launcher handing out one shared [`MockRenderer`].
#[derive(Clone)]
pub struct MockLauncher {
    renderer: MockRenderer,
    launches: Arc<Mutex<usize>>,
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockLauncher {
    pub fn new(renderer: MockRenderer) -> Self {
        Self {
            renderer,
            launches: Arc::new(Mutex::new(0)),
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        let launcher = Self::new(MockRenderer::new());
        *launcher.error.lock().unwrap() = Some(error);
        launcher
    }

    pub fn launches(&self) -> usize {
        *self.launches.lock().unwrap()
    }
}

impl RendererLauncher for MockLauncher {
    type Renderer = MockRenderer;

    async fn launch(&self) -> Result<MockRenderer, AppError> {
        *self.launches.lock().unwrap() += 1;
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.renderer.clone())
    }
}

/// Login handoff that records the URLs it was asked to wait on.
#[derive(Clone, Default)]
pub struct MockLogin {
    waits: Arc<Mutex<Vec<String>>>,
}

impl MockLogin {
    pub fn waits(&self) -> Vec<String> {
        self.waits.lock().unwrap().clone()
    }
}

impl LoginHandoff for MockLogin {
    async fn wait_for_login(&self, login_url: &str) -> Result<(), AppError> {
        self.waits.lock().unwrap().push(login_url.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that keeps the debug rendering of every event.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    /// Number of events whose rendering starts with `name`.
    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(name))
            .count()
    }
}

impl RunReporter for RecordingReporter {
    fn report(&self, event: RunEvent<'_>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}
