use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use mirror_core::{FailureKey, SessionState, StaticAssetSet};
use mirror_engine::{FetchedBody, Retrieval, Retriever, StrategyKind, TieredRetriever};
use pretty_assertions::assert_eq;
use url::Url;

struct Fixed {
    answer: Retrieval,
    calls: AtomicUsize,
}

impl Fixed {
    fn new(answer: Retrieval) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Retriever for Fixed {
    async fn retrieve(&self, _url: &Url, _session: &SessionState) -> Retrieval {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

fn success(strategy: StrategyKind) -> Retrieval {
    Retrieval::Success(FetchedBody {
        bytes: Bytes::from_static(b"x"),
        content_type: None,
        strategy,
    })
}

fn tiered(direct: &Arc<Fixed>, rendered: &Arc<Fixed>) -> TieredRetriever {
    TieredRetriever::new(StaticAssetSet::default(), direct.clone(), rendered.clone())
}

fn url(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}

#[tokio::test]
async fn static_asset_uses_direct_when_it_succeeds() {
    let direct = Fixed::new(success(StrategyKind::Direct));
    let rendered = Fixed::new(success(StrategyKind::Rendered));

    let result = tiered(&direct, &rendered)
        .retrieve(&url("https://e.test/css/site.css"), &SessionState::default())
        .await;

    assert_eq!(result, success(StrategyKind::Direct));
    assert_eq!((direct.calls(), rendered.calls()), (1, 0));
}

#[tokio::test]
async fn static_asset_falls_back_on_failure() {
    let direct = Fixed::new(Retrieval::Failure(FailureKey::AccessDenied));
    let rendered = Fixed::new(success(StrategyKind::Rendered));

    let result = tiered(&direct, &rendered)
        .retrieve(&url("https://e.test/img/logo.PNG"), &SessionState::default())
        .await;

    assert_eq!(result, success(StrategyKind::Rendered));
    assert_eq!((direct.calls(), rendered.calls()), (1, 1));
}

#[tokio::test]
async fn static_asset_falls_back_on_not_found() {
    let direct = Fixed::new(Retrieval::NotFound);
    let rendered = Fixed::new(Retrieval::NotFound);

    let result = tiered(&direct, &rendered)
        .retrieve(&url("https://e.test/app.js"), &SessionState::default())
        .await;

    assert_eq!(result, Retrieval::NotFound);
    assert_eq!((direct.calls(), rendered.calls()), (1, 1));
}

#[tokio::test]
async fn pages_are_rendered_only() {
    let direct = Fixed::new(success(StrategyKind::Direct));
    let rendered = Fixed::new(Retrieval::Failure(FailureKey::Status(500)));

    let tiered = tiered(&direct, &rendered);
    for page in ["https://e.test/about", "https://e.test/", "https://e.test/index.html"] {
        let result = tiered.retrieve(&url(page), &SessionState::default()).await;
        assert_eq!(result, Retrieval::Failure(FailureKey::Status(500)));
    }
    assert_eq!((direct.calls(), rendered.calls()), (0, 3));
}
