use std::collections::BTreeMap;

/// A cookie harvested from the target origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

/// Cookies and header overrides shared by every fetch attempt.
///
/// Instances are immutable once published; a refresh builds a new one with a
/// higher version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    version: u64,
    cookies: Vec<SessionCookie>,
    headers: BTreeMap<String, String>,
}

impl SessionState {
    pub fn new(cookies: Vec<SessionCookie>, headers: BTreeMap<String, String>) -> Self {
        Self {
            version: 0,
            cookies,
            headers,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// `name=value` pairs joined for a `Cookie` request header.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let joined = self
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        Some(joined)
    }
}
