use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mirror_core::{SessionCookie, SessionState};
use mirror_engine::{SessionError, SessionSource, SessionStore};
use pretty_assertions::assert_eq;

/// Each bootstrap hands out a cookie carrying its sequence number; calls
/// numbered `fail_from` and later fail.
struct SlowSource {
    calls: AtomicU64,
    fail_from: Option<u64>,
}

impl SlowSource {
    fn new(fail_from: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU64::new(0),
            fail_from,
        })
    }
}

#[async_trait::async_trait]
impl SessionSource for SlowSource {
    async fn establish(&self) -> Result<SessionState, SessionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.fail_from.is_some_and(|first| n >= first) {
            return Err(SessionError::Browser("origin unreachable".into()));
        }
        let cookie = SessionCookie {
            name: "sid".into(),
            value: n.to_string(),
            domain: "e.test".into(),
            path: "/".into(),
            secure: true,
            http_only: true,
        };
        Ok(SessionState::new(vec![cookie], BTreeMap::new()))
    }
}

#[tokio::test(start_paused = true)]
async fn bootstrap_starts_at_version_one() {
    let store = SessionStore::bootstrap(SlowSource::new(None)).await.unwrap();
    let snapshot = store.snapshot();
    assert_eq!(snapshot.version(), 1);
    assert_eq!(snapshot.cookie_header().as_deref(), Some("sid=1"));
}

#[tokio::test(start_paused = true)]
async fn failed_bootstrap_is_an_error() {
    let source = SlowSource::new(Some(1));
    let Err(err) = SessionStore::bootstrap(source.clone()).await else {
        panic!("bootstrap should fail when the origin is unreachable");
    };
    assert_eq!(err, SessionError::Browser("origin unreachable".into()));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_refreshes_of_same_version_coalesce() {
    let source = SlowSource::new(None);
    let store = Arc::new(SessionStore::bootstrap(source.clone()).await.unwrap());

    let (a, b, c) = tokio::join!(store.refresh(1), store.refresh(1), store.refresh(1));
    let versions = [a.unwrap().version(), b.unwrap().version(), c.unwrap().version()];

    assert_eq!(versions, [2, 2, 2]);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.snapshot().cookie_header().as_deref(), Some("sid=2"));
}

#[tokio::test(start_paused = true)]
async fn stale_refresh_returns_current_session() {
    let source = SlowSource::new(None);
    let store = SessionStore::bootstrap(source.clone()).await.unwrap();
    store.refresh(1).await.unwrap();

    let current = store.refresh(1).await.unwrap();
    assert_eq!(current.version(), 2);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_previous_session() {
    let store = SessionStore::bootstrap(SlowSource::new(Some(2))).await.unwrap();
    let err = store.refresh(1).await.unwrap_err();
    assert_eq!(err, SessionError::Browser("origin unreachable".into()));
    assert_eq!(store.snapshot().version(), 1);
}

#[tokio::test]
async fn fixed_store_never_changes() {
    let store = SessionStore::fixed(SessionState::default().with_version(7));
    let refreshed = store.refresh(7).await.unwrap();
    assert_eq!(refreshed.version(), 7);
}
