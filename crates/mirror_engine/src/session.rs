use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, Page};
use mirror_core::{SessionCookie, SessionState};
use mirror_logging::{mirror_info, mirror_warn};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

use crate::page::{navigate_to_dom_ready, with_fresh_page, PageRunError};
use crate::stealth::{browser_error, prepare_page, StealthSettings};
use crate::FetchError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session navigation to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("session bootstrap failed: {0}")]
    Browser(String),
}

impl From<FetchError> for SessionError {
    fn from(err: FetchError) -> Self {
        SessionError::Browser(err.message)
    }
}

/// Produces a fresh session against the target origin.
#[async_trait::async_trait]
pub trait SessionSource: Send + Sync {
    async fn establish(&self) -> Result<SessionState, SessionError>;
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub base_url: Url,
    pub user_agent: String,
    pub navigation_timeout: Duration,
    /// Scroll to the bottom after load to trigger lazy content.
    pub scroll: bool,
    pub settle_delay: Duration,
    pub stealth: StealthSettings,
}

/// Harvests cookies by visiting the base origin in the browser.
pub struct BrowserSession {
    browser: Arc<Browser>,
    settings: SessionSettings,
}

impl BrowserSession {
    pub fn new(browser: Arc<Browser>, settings: SessionSettings) -> Self {
        Self { browser, settings }
    }

    async fn harvest(&self, page: &Page) -> Result<SessionState, FetchError> {
        prepare_page(page, &self.settings.user_agent, &self.settings.stealth).await?;

        let base = self.settings.base_url.as_str();
        navigate_to_dom_ready(page, base).await?;

        if self.settings.scroll {
            if let Err(err) = page
                .evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await
            {
                mirror_warn!("Scroll on {} failed: {}", base, err);
            }
        }
        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        let cookies = page
            .get_cookies()
            .await
            .map_err(browser_error)?
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect();

        let mut headers = BTreeMap::new();
        headers.insert("referer".to_string(), base.to_string());
        Ok(SessionState::new(cookies, headers))
    }
}

#[async_trait::async_trait]
impl SessionSource for BrowserSession {
    async fn establish(&self) -> Result<SessionState, SessionError> {
        // The settle pause is not part of the navigation budget.
        let limit = self.settings.navigation_timeout + self.settings.settle_delay;
        let result = with_fresh_page(self.browser.as_ref(), limit, |page| async move {
            self.harvest(&page).await
        })
        .await;
        session_result(&self.settings.base_url, limit, result)
    }
}

fn session_result(
    base_url: &Url,
    limit: Duration,
    result: Result<SessionState, PageRunError>,
) -> Result<SessionState, SessionError> {
    result.map_err(|err| match err {
        PageRunError::Failed(err) => SessionError::from(err),
        PageRunError::TimedOut => SessionError::Timeout {
            url: base_url.to_string(),
            timeout: limit,
        },
    })
}

/// Versioned, atomically replaced session snapshot.
///
/// Readers take an `Arc` of the current state and keep using it for the whole
/// attempt. A refresh publishes a complete new state; concurrent refresh
/// requests that observed the same version collapse into one bootstrap.
pub struct SessionStore {
    current: RwLock<Arc<SessionState>>,
    source: Option<Arc<dyn SessionSource>>,
    refresh_lock: Mutex<()>,
}

impl SessionStore {
    /// Establish the initial session; failure here is fatal for the run.
    pub async fn bootstrap(source: Arc<dyn SessionSource>) -> Result<Self, SessionError> {
        let state = source.establish().await?.with_version(1);
        mirror_info!(
            "Session established with {} cookie(s)",
            state.cookies().len()
        );
        Ok(Self {
            current: RwLock::new(Arc::new(state)),
            source: Some(source),
            refresh_lock: Mutex::new(()),
        })
    }

    /// A store that never refreshes.
    pub fn fixed(state: SessionState) -> Self {
        Self {
            current: RwLock::new(Arc::new(state)),
            source: None,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        self.current.read().clone()
    }

    /// Replace the session unless someone already did since `observed`.
    pub async fn refresh(&self, observed: u64) -> Result<Arc<SessionState>, SessionError> {
        let Some(source) = &self.source else {
            return Ok(self.snapshot());
        };

        let _guard = self.refresh_lock.lock().await;
        let current = self.snapshot();
        if current.version() != observed {
            return Ok(current);
        }

        let next = Arc::new(source.establish().await?.with_version(observed + 1));
        *self.current.write() = next.clone();
        mirror_info!(
            "Session refreshed to version {} with {} cookie(s)",
            next.version(),
            next.cookies().len()
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::page::fake::CountingHost;
    use crate::FailureKind;

    fn base() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_harvest_times_out_and_closes_its_page() {
        let host = CountingHost::default();
        let limit = Duration::from_secs(30);
        let result = with_fresh_page(&host, limit, |_| async {
            tokio::time::sleep(Duration::from_secs(300)).await;
            Ok(SessionState::default())
        })
        .await;

        assert_eq!(
            session_result(&base(), limit, result),
            Err(SessionError::Timeout {
                url: "https://example.com/".to_string(),
                timeout: limit,
            })
        );
        assert_eq!(host.counts(), (1, 1));
    }

    #[tokio::test]
    async fn failed_page_open_is_a_browser_error() {
        let host = CountingHost {
            fail_open: true,
            ..CountingHost::default()
        };
        let limit = Duration::from_secs(30);
        let result =
            with_fresh_page(&host, limit, |_| async { Ok(SessionState::default()) }).await;

        assert_eq!(
            session_result(&base(), limit, result),
            Err(SessionError::Browser("no target".to_string()))
        );
        assert_eq!(host.counts(), (0, 0));
    }

    #[tokio::test]
    async fn harvest_error_closes_the_page() {
        let host = CountingHost::default();
        let limit = Duration::from_secs(30);
        let result: Result<SessionState, _> = with_fresh_page(&host, limit, |_| async {
            Err(FetchError::new(FailureKind::Browser, "net::ERR_NAME_NOT_RESOLVED"))
        })
        .await;

        assert_eq!(
            session_result(&base(), limit, result),
            Err(SessionError::Browser("net::ERR_NAME_NOT_RESOLVED".to_string()))
        );
        assert_eq!(host.counts(), (1, 1));
    }
}
