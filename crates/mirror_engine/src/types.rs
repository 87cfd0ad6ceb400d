use std::fmt;

use bytes::Bytes;
use mirror_core::{FailureKey, Outcome};

/// Which mechanism produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Direct,
    Rendered,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Direct => write!(f, "direct"),
            StrategyKind::Rendered => write!(f, "rendered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub strategy: StrategyKind,
}

/// Result of a single retrieval attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    Success(FetchedBody),
    NotFound,
    Failure(FailureKey),
}

impl Retrieval {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Retrieval::Success(_) | Retrieval::NotFound)
    }

    /// Classify a completed response by its status.
    pub(crate) fn from_status(
        status: u16,
        status_text: &str,
        body: Bytes,
        content_type: Option<String>,
        strategy: StrategyKind,
    ) -> Self {
        match status {
            200 => Retrieval::Success(FetchedBody {
                bytes: body,
                content_type,
                strategy,
            }),
            404 => Retrieval::NotFound,
            _ if is_access_denied(status, status_text, &body) => {
                Retrieval::Failure(FailureKey::AccessDenied)
            }
            _ => Retrieval::Failure(FailureKey::Status(status)),
        }
    }
}

const ACCESS_DENIED_MARKER: &str = "Access Denied";

/// Edge-protected origins answer with a 403 whose status text or page title
/// carries this marker.
pub(crate) fn is_access_denied(status: u16, status_text: &str, body: &[u8]) -> bool {
    if status_text.contains(ACCESS_DENIED_MARKER) {
        return true;
    }
    if status != 403 {
        return false;
    }
    let head = &body[..body.len().min(4096)];
    String::from_utf8_lossy(head).contains(ACCESS_DENIED_MARKER)
}

/// Progress and outcome notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    TaskStarted {
        index: usize,
        total: usize,
        url: String,
    },
    AttemptFailed {
        url: String,
        attempt: u32,
        key: FailureKey,
    },
    SessionRefreshed {
        version: u64,
    },
    Settled {
        url: String,
        outcome: Outcome,
        attempts: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub status: u16,
    pub status_text: String,
    pub bytes: Bytes,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Key under which this error is recorded once retries run out.
    pub fn failure_key(&self) -> FailureKey {
        match &self.kind {
            FailureKind::Browser => FailureKey::reason(self.message.clone()),
            // Transport messages embed the URL; group them by kind instead.
            other => FailureKey::reason(other.to_string()),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
    Browser,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Browser => write!(f, "browser error"),
        }
    }
}
