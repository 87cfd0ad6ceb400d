//! Browser-like request headers, chosen per asset kind.
use mirror_core::{AssetKind, SessionState};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

use mirror_logging::mirror_debug;

use crate::FetchSettings;

/// Ordered header list for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    /// Common headers, then the kind-specific profile, then session overrides.
    pub fn for_request(settings: &FetchSettings, kind: AssetKind, session: &SessionState) -> Self {
        let mut set = Self::default();
        set.insert("accept-language", &settings.accept_language);
        set.insert("cache-control", "no-cache");
        set.insert("dnt", "1");
        set.insert("pragma", "no-cache");
        set.insert("sec-ch-ua", &settings.sec_ch_ua);
        set.insert("sec-ch-ua-mobile", "?0");
        set.insert("sec-ch-ua-platform", &settings.sec_ch_ua_platform);
        set.insert("user-agent", &settings.user_agent);

        for (name, value) in profile(kind) {
            set.insert(name, value);
        }
        for (name, value) in session.headers() {
            set.insert(name, value);
        }
        set
    }

    /// Replace-or-append, case-insensitive on the name.
    pub fn insert(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name, value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) {
        let name = name.to_ascii_lowercase();
        self.entries.retain(|(n, _)| *n != name);
    }

    /// Entries that are not valid HTTP headers are skipped.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => mirror_debug!("Skipping invalid header {:?}", name),
            }
        }
        map
    }

    /// JSON object form used by the DevTools protocol.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(n, v)| (n.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

fn profile(kind: AssetKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        AssetKind::Document => &[
            ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            ("priority", "u=0, i"),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "same-origin"),
            ("sec-fetch-user", "?1"),
            ("upgrade-insecure-requests", "1"),
        ],
        AssetKind::Stylesheet => &[
            ("accept", "text/css,*/*;q=0.1"),
            ("priority", "u=0"),
            ("sec-fetch-dest", "style"),
            ("sec-fetch-mode", "no-cors"),
            ("sec-fetch-site", "same-origin"),
        ],
        AssetKind::Script => &[
            ("accept", "*/*"),
            ("priority", "u=1"),
            ("sec-fetch-dest", "script"),
            ("sec-fetch-mode", "no-cors"),
            ("sec-fetch-site", "same-origin"),
        ],
        AssetKind::Image => &[
            ("accept", "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8"),
            ("priority", "u=2, i"),
            ("sec-fetch-dest", "image"),
            ("sec-fetch-mode", "no-cors"),
            ("sec-fetch-site", "same-origin"),
        ],
        AssetKind::Other => &[],
    }
}
