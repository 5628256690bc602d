pub mod fetcher;

#[cfg(feature = "browser")]
pub mod browser;

pub use fetcher::ReqwestFetcher;

#[cfg(feature = "browser")]
pub use browser::{BrowserOptions, ChromiumLauncher, ChromiumRenderer};
