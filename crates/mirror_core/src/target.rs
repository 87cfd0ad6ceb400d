use std::collections::HashSet;
use std::fmt;

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("cannot join {path:?} onto base: {reason}")]
    Join { path: String, reason: String },
    #[error("target {0:?} is not a valid absolute url")]
    Invalid(String),
}

/// An absolute, percent-decoded target address.
///
/// The decoded form is the identity used for deduplication and for every
/// bucket of the run state. It is re-parsed (and therefore re-encoded) only
/// when a request is about to be issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetUrl(String);

impl TargetUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn to_url(&self) -> Result<Url, TargetError> {
        Url::parse(&self.0).map_err(|_| TargetError::Invalid(self.0.clone()))
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    /// Distinct targets in first-seen order.
    pub targets: Vec<TargetUrl>,
    pub duplicates: usize,
    pub rejected: Vec<TargetError>,
}

/// Parse the newline-delimited target list.
///
/// Lines are trimmed; blank lines and `//` comments are dropped.
pub fn parse_target_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .map(ToOwned::to_owned)
        .collect()
}

/// Resolve relative paths against `base`, decode them, and drop duplicates.
pub fn build_targets<I, S>(base: &Url, paths: I) -> TargetSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut set = TargetSet::default();

    for path in paths {
        let path = path.as_ref();
        let joined = match base.join(path) {
            Ok(url) => url,
            Err(err) => {
                set.rejected.push(TargetError::Join {
                    path: path.to_string(),
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let decoded = decode_href(joined.as_str());
        if seen.insert(decoded.clone()) {
            set.targets.push(TargetUrl(decoded));
        } else {
            set.duplicates += 1;
        }
    }

    set
}

fn decode_href(href: &str) -> String {
    match urlencoding::decode(href) {
        Ok(decoded) => decoded.into_owned(),
        // Escapes that do not form UTF-8 stay encoded rather than being mangled.
        Err(_) => href.to_string(),
    }
}
