use std::future::Future;

use crate::error::AppError;

/// Fetches the raw body of a URL.
///
/// Implementations return [`AppError::NotFound`] for a 404 and a transport
/// error ([`AppError::is_transport`]) for any other non-success status.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// A structural region of the rendered page matched by a CSS selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub selector: String,
    /// The region's `textContent`.
    pub text: String,
}

/// Opaque identifier of a browsing context (tab or window).
pub type WindowHandle = String;

/// A live rendering session that can be driven and inspected.
pub trait Renderer: Send + Sync {
    /// Navigate the current browsing context and wait for the page to load.
    fn navigate(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Look up the first element matching `selector` on the current page.
    fn find_region(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Option<Region>, AppError>> + Send;

    /// Click a region previously returned by [`Renderer::find_region`].
    fn activate(&self, region: &Region) -> impl Future<Output = Result<(), AppError>> + Send;

    fn current_window(&self) -> impl Future<Output = Result<WindowHandle, AppError>> + Send;

    /// All open browsing contexts of the session.
    fn window_handles(&self) -> impl Future<Output = Result<Vec<WindowHandle>, AppError>> + Send;

    fn switch_window(
        &self,
        handle: &WindowHandle,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn close_window(
        &self,
        handle: &WindowHandle,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// End the rendering session.
    fn close(&self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Opens rendering sessions on demand.
///
/// The orchestrator only launches a session once it knows at least one
/// listing needs classifying.
pub trait RendererLauncher: Send + Sync {
    type Renderer: Renderer;

    fn launch(&self) -> impl Future<Output = Result<Self::Renderer, AppError>> + Send;
}

/// Hands the freshly opened session to a human to complete authentication.
pub trait LoginHandoff: Send + Sync {
    /// Returns once the user confirms they are logged in.
    fn wait_for_login(&self, login_url: &str)
    -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A LoginHandoff that returns immediately, for sessions that are already
/// authenticated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLogin;

impl LoginHandoff for NoLogin {
    async fn wait_for_login(&self, _login_url: &str) -> Result<(), AppError> {
        Ok(())
    }
}
