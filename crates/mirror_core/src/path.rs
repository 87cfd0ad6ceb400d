use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Leaf name used for directory-like URLs.
pub const INDEX_LEAF: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("url {0:?} has no host")]
    MissingHost(String),
}

/// Maps absolute URLs onto `<root>/<host>/<segments...>`.
///
/// Resolution never touches the filesystem. Distinct URLs that decode to the
/// same segments map to the same path; the last write wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, url: &str) -> Result<PathBuf, ResolveError> {
        let parsed = Url::parse(url).map_err(|err| ResolveError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        self.resolve_url(&parsed)
    }

    pub fn resolve_url(&self, url: &Url) -> Result<PathBuf, ResolveError> {
        let host = url
            .host_str()
            .ok_or_else(|| ResolveError::MissingHost(url.to_string()))?;

        let mut path = url.path().to_string();
        if path.is_empty() || path.ends_with('/') {
            path.push_str(INDEX_LEAF);
        }

        let mut target = self.root.join(host);
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            target.push(sanitize_segment(segment));
        }
        Ok(target)
    }
}

/// Percent-decode one path segment and replace filesystem-illegal characters.
///
/// Decoding happens exactly once and before replacement, so an encoded `%2F`
/// ends up as `_` rather than as a separator.
pub fn sanitize_segment(raw: &str) -> String {
    let decoded = match urlencoding::decode(raw) {
        Ok(text) => text.into_owned(),
        Err(_) => {
            let bytes = urlencoding::decode_binary(raw.as_bytes());
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };
    let cleaned: String = decoded
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    // A decoded dot segment must not climb out of the host directory.
    match cleaned.as_str() {
        "." => "_".to_string(),
        ".." => "__".to_string(),
        _ => cleaned,
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_separator_is_replaced_not_split() {
        assert_eq!(sanitize_segment("a%2Fb"), "a_b");
        assert_eq!(sanitize_segment("q%3Fx%2A"), "q_x_");
    }

    #[test]
    fn double_encoding_is_decoded_once() {
        assert_eq!(sanitize_segment("%252F"), "%2F");
    }

    #[test]
    fn dot_segments_are_neutralized() {
        assert_eq!(sanitize_segment("%2E%2E"), "__");
        assert_eq!(sanitize_segment("."), "_");
    }
}
