pub mod classify;
pub mod config;
pub mod discovery;
pub mod error;
pub mod group;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod patterns;
pub mod reporter;
pub mod summary;
pub mod thread;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use classify::Classifier;
pub use config::{DEFAULT_SOURCES, RunConfig, default_history_file};
pub use discovery::{Discovery, DiscoveryPlan, DiscoveryStats};
pub use error::{AppError, ParseFailure};
pub use history::{History, PersistentHistory};
pub use models::{Classification, Harvest, Outcome, SourceKind};
pub use orchestrator::{Orchestrator, RunReport};
pub use patterns::SourcePatterns;
pub use reporter::{RunEvent, RunReporter, TracingRunReporter};
pub use summary::Summary;
pub use throttle::{Pacer, ThrottleConfig};
pub use traits::{Fetcher, LoginHandoff, NoLogin, Region, Renderer, RendererLauncher, WindowHandle};
