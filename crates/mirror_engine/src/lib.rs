//! Sitemirror engine: retrieval strategies, session handling and the run loop.
mod browser;
mod fetch;
mod headers;
mod page;
mod persist;
mod render;
mod retry;
mod scheduler;
mod session;
mod stealth;
mod strategy;
mod types;

pub use browser::{BrowserError, BrowserHost, BrowserSettings};
pub use fetch::{DirectFetcher, FetchSettings, Retriever, DEFAULT_USER_AGENT};
pub use headers::HeaderSet;
pub use persist::{
    clean_output_dir, ensure_output_dir, write_atomic, AssetWriter, PersistError,
};
pub use render::{RenderSettings, RenderedFetcher};
pub use retry::{RetryController, RetrySettings, Settled};
pub use scheduler::{ChannelProgressSink, ProgressSink, Scheduler, SchedulerSettings};
pub use session::{BrowserSession, SessionError, SessionSettings, SessionSource, SessionStore};
pub use stealth::{stealth_scripts, StealthSettings};
pub use strategy::TieredRetriever;
pub use types::{
    EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, FetchedBody, Retrieval,
    StrategyKind,
};
