use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use mirror_core::{AssetKind, SessionState};
use mirror_logging::{mirror_debug, mirror_trace};
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::headers::HeaderSet;
use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput, Retrieval, StrategyKind};

pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36"
);

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_platform: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            redirect_limit: 5,
            max_bytes: 256 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            sec_ch_ua: r#""Not)A;Brand";v="8", "Chromium";v="138", "Google Chrome";v="138""#
                .to_string(),
            sec_ch_ua_platform: r#""Windows""#.to_string(),
        }
    }
}

/// One way of retrieving a target.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, url: &Url, session: &SessionState) -> Retrieval;
}

/// Plain HTTP fetch with browser-like headers and the session cookies.
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl DirectFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    /// Issue the request and read the whole body, whatever the status.
    pub async fn fetch(&self, url: &Url, headers: &HeaderSet) -> Result<FetchOutput, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::new(FailureKind::InvalidUrl, url.to_string()));
        }

        let response = self
            .client
            .get(url.clone())
            .headers(headers.to_header_map())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        let bytes: Bytes = bytes.freeze();

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            bytes,
            metadata,
        })
    }
}

#[async_trait::async_trait]
impl Retriever for DirectFetcher {
    async fn retrieve(&self, url: &Url, session: &SessionState) -> Retrieval {
        let mut headers = HeaderSet::for_request(&self.settings, AssetKind::of(url), session);
        if let Some(cookie) = session.cookie_header() {
            headers.insert("cookie", &cookie);
        }

        match self.fetch(url, &headers).await {
            Ok(output) => {
                let meta = &output.metadata;
                if meta.final_url != meta.original_url {
                    mirror_debug!("{} redirected to {}", meta.original_url, meta.final_url);
                }
                mirror_trace!("{} answered {} ({} bytes)", url, output.status, meta.byte_len);
                Retrieval::from_status(
                    output.status,
                    &output.status_text,
                    output.bytes,
                    output.metadata.content_type,
                    StrategyKind::Direct,
                )
            }
            Err(err) => {
                mirror_debug!("Direct fetch of {} failed: {}", url, err);
                Retrieval::Failure(err.failure_key())
            }
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
