//! Page lifecycle shared by rendered fetches and session bootstrap.
use std::future::Future;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::{EventDomContentEventFired, NavigateParams};
use chromiumoxide::{Browser, Page};
use futures_util::StreamExt;
use mirror_logging::mirror_warn;

use crate::stealth::browser_error;
use crate::{FailureKind, FetchError};

/// Opens and closes the pages a unit of browser work runs on.
#[async_trait::async_trait]
pub(crate) trait PageHost: Send + Sync {
    type Page: Clone + Send + Sync + 'static;

    async fn open(&self) -> Result<Self::Page, FetchError>;
    async fn close(&self, page: Self::Page);
}

#[async_trait::async_trait]
impl PageHost for Browser {
    type Page = Page;

    async fn open(&self) -> Result<Page, FetchError> {
        self.new_page("about:blank").await.map_err(browser_error)
    }

    async fn close(&self, page: Page) {
        if let Err(err) = page.close().await {
            mirror_warn!("Failed to close page: {}", err);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PageRunError {
    Failed(FetchError),
    TimedOut,
}

/// Run `work` on a fresh page bounded by `limit`; the page is closed on every
/// path once it has been opened.
pub(crate) async fn with_fresh_page<H, T, F, Fut>(
    host: &H,
    limit: Duration,
    work: F,
) -> Result<T, PageRunError>
where
    H: PageHost,
    F: FnOnce(H::Page) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let page = host.open().await.map_err(PageRunError::Failed)?;
    let outcome = tokio::time::timeout(limit, work(page.clone())).await;
    host.close(page).await;

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(PageRunError::Failed(err)),
        Err(_) => Err(PageRunError::TimedOut),
    }
}

/// Navigate `page` and return at DOMContentLoaded; subresources may still be
/// loading.
pub(crate) async fn navigate_to_dom_ready(page: &Page, url: &str) -> Result<(), FetchError> {
    let mut dom_ready = page
        .event_listener::<EventDomContentEventFired>()
        .await
        .map_err(browser_error)?;

    let navigation = page
        .execute(NavigateParams::new(url))
        .await
        .map_err(browser_error)?;
    if let Some(error) = navigation
        .result
        .error_text
        .as_deref()
        .filter(|text| !text.is_empty())
    {
        return Err(FetchError::new(FailureKind::Browser, error));
    }

    match dom_ready.next().await {
        Some(_) => Ok(()),
        None => Err(FetchError::new(
            FailureKind::Browser,
            "page closed before DOMContentLoaded",
        )),
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::fake::CountingHost;
    use super::*;

    const LIMIT: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn page_is_closed_after_success() {
        let host = CountingHost::default();
        let result = with_fresh_page(&host, LIMIT, |page| async move { Ok(page + 40) }).await;
        assert_eq!(result, Ok(40));
        assert_eq!(host.counts(), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn page_is_closed_after_an_error() {
        let host = CountingHost::default();
        let result: Result<(), _> = with_fresh_page(&host, LIMIT, |_| async {
            Err(FetchError::new(FailureKind::Browser, "net::ERR_ABORTED"))
        })
        .await;
        assert_eq!(
            result,
            Err(PageRunError::Failed(FetchError::new(
                FailureKind::Browser,
                "net::ERR_ABORTED"
            )))
        );
        assert_eq!(host.counts(), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn page_is_closed_after_a_timeout() {
        let host = CountingHost::default();
        let result = with_fresh_page(&host, LIMIT, |_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(PageRunError::TimedOut));
        assert_eq!(host.counts(), (1, 1));
    }

    #[tokio::test]
    async fn nothing_to_close_when_open_fails() {
        let host = CountingHost {
            fail_open: true,
            ..CountingHost::default()
        };
        let result = with_fresh_page(&host, LIMIT, |_| async { Ok(()) }).await;
        assert!(matches!(result, Err(PageRunError::Failed(_))));
        assert_eq!(host.counts(), (0, 0));
    }
}
