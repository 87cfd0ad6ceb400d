use std::fmt;

/// Key under which a terminal failure is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKey {
    Status(u16),
    AccessDenied,
    Reason(String),
}

impl FailureKey {
    pub fn reason(reason: impl Into<String>) -> Self {
        FailureKey::Reason(reason.into())
    }
}

impl fmt::Display for FailureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKey::Status(code) => write!(f, "{code}"),
            FailureKey::AccessDenied => write!(f, "ACCESS_DENIED"),
            FailureKey::Reason(reason) => write!(f, "{reason}"),
        }
    }
}

/// Terminal outcome of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotFound,
    Failed(FailureKey),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::NotFound => write!(f, "not found"),
            Outcome::Failed(key) => write!(f, "failed [{key}]"),
        }
    }
}
