//! Sitemirror core: pure data model and functions for the retrieval run.
mod asset;
mod backoff;
mod outcome;
mod path;
mod report;
mod session;
mod state;
mod target;

pub use asset::{extension_of, AssetKind, StaticAssetSet, DEFAULT_STATIC_EXTENSIONS};
pub use backoff::BackoffSchedule;
pub use outcome::{FailureKey, Outcome};
pub use path::{sanitize_segment, PathResolver, ResolveError, INDEX_LEAF};
pub use report::Report;
pub use session::{SessionCookie, SessionState};
pub use state::{Bucket, RunState};
pub use target::{build_targets, parse_target_list, TargetError, TargetSet, TargetUrl};
