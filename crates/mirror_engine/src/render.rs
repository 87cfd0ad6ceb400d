use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use bytes::Bytes;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EventResponseReceived, GetResponseBodyParams, Headers, RequestId, ResourceType,
    SetExtraHttpHeadersParams,
};
use chromiumoxide::{Browser, Page};
use futures_util::StreamExt;
use mirror_core::{AssetKind, FailureKey, SessionState};
use mirror_logging::{mirror_debug, mirror_warn};
use url::Url;

use crate::headers::HeaderSet;
use crate::page::{navigate_to_dom_ready, with_fresh_page, PageRunError};
use crate::stealth::{browser_error, prepare_page, StealthSettings};
use crate::{FailureKind, FetchError, FetchSettings, Retrieval, Retriever, StrategyKind};

const DOCUMENT_RESPONSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub navigation_timeout: Duration,
    pub stealth: StealthSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(60),
            stealth: StealthSettings::default(),
        }
    }
}

/// Full browser navigation; one fresh page per attempt.
pub struct RenderedFetcher {
    browser: Arc<Browser>,
    fetch: FetchSettings,
    settings: RenderSettings,
}

impl RenderedFetcher {
    pub fn new(browser: Arc<Browser>, fetch: FetchSettings, settings: RenderSettings) -> Self {
        Self {
            browser,
            fetch,
            settings,
        }
    }

    async fn render(
        &self,
        page: &Page,
        url: &Url,
        session: &SessionState,
    ) -> Result<Retrieval, FetchError> {
        prepare_page(page, &self.fetch.user_agent, &self.settings.stealth).await?;

        let cookies = cookie_params(session, url);
        if !cookies.is_empty() {
            page.set_cookies(cookies).await.map_err(browser_error)?;
        }

        let mut headers = HeaderSet::for_request(&self.fetch, AssetKind::of(url), session);
        // Carried by the user-agent override instead.
        headers.remove("user-agent");
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(headers.to_json())))
            .await
            .map_err(browser_error)?;

        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(browser_error)?;
        navigate_to_dom_ready(page, url.as_str()).await?;

        // Responses are buffered by the listener; the first document one
        // belongs to the top-level navigation.
        let document = tokio::time::timeout(DOCUMENT_RESPONSE_GRACE, async {
            while let Some(event) = responses.next().await {
                if event.r#type == ResourceType::Document {
                    return Some(event);
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
        .ok_or_else(|| FetchError::new(FailureKind::Browser, "no document response"))?;

        let response = &document.response;
        let status = u16::try_from(response.status).unwrap_or_default();
        let body = read_body(page, document.request_id.clone()).await?;

        Ok(Retrieval::from_status(
            status,
            &response.status_text,
            body,
            Some(response.mime_type.clone()),
            StrategyKind::Rendered,
        ))
    }
}

#[async_trait::async_trait]
impl Retriever for RenderedFetcher {
    async fn retrieve(&self, url: &Url, session: &SessionState) -> Retrieval {
        let result = with_fresh_page(
            self.browser.as_ref(),
            self.settings.navigation_timeout,
            |page| async move { self.render(&page, url, session).await },
        )
        .await;
        settle(url, result)
    }
}

fn settle(url: &Url, result: Result<Retrieval, PageRunError>) -> Retrieval {
    match result {
        Ok(retrieval) => retrieval,
        Err(PageRunError::Failed(err)) => {
            mirror_debug!("Rendered fetch of {} failed: {}", url, err);
            Retrieval::Failure(err.failure_key())
        }
        Err(PageRunError::TimedOut) => Retrieval::Failure(FailureKey::reason("NAVIGATION_TIMEOUT")),
    }
}

async fn read_body(page: &Page, request_id: RequestId) -> Result<Bytes, FetchError> {
    let response = page
        .execute(GetResponseBodyParams::new(request_id))
        .await
        .map_err(browser_error)?;
    let body = &response.result;
    if body.base64_encoded {
        base64::engine::general_purpose::STANDARD
            .decode(body.body.as_bytes())
            .map(Bytes::from)
            .map_err(|err| FetchError::new(FailureKind::Browser, format!("BUFFER_ERROR: {err}")))
    } else {
        Ok(Bytes::from(body.body.clone()))
    }
}

/// Session cookies as DevTools parameters; cookies without a domain are bound
/// to the target URL.
fn cookie_params(session: &SessionState, url: &Url) -> Vec<CookieParam> {
    session
        .cookies()
        .iter()
        .filter_map(|cookie| {
            let mut builder = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .secure(cookie.secure)
                .http_only(cookie.http_only);
            if cookie.domain.is_empty() {
                builder = builder.url(url.to_string());
            } else {
                builder = builder.domain(cookie.domain.clone());
            }
            if !cookie.path.is_empty() {
                builder = builder.path(cookie.path.clone());
            }
            match builder.build() {
                Ok(param) => Some(param),
                Err(err) => {
                    mirror_warn!("Skipping cookie {}: {}", cookie.name, err);
                    None
                }
            }
        })
        .collect()
}
