use std::sync::Arc;

use mirror_core::{BackoffSchedule, FailureKey};
use mirror_logging::{mirror_error, mirror_warn};
use url::Url;

use crate::session::SessionStore;
use crate::{EngineEvent, ProgressSink, Retrieval, Retriever};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff: BackoffSchedule,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffSchedule::default(),
        }
    }
}

/// Final retrieval of one target together with the attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub retrieval: Retrieval,
    pub attempts: u32,
}

pub struct RetryController {
    retriever: Arc<dyn Retriever>,
    session: Arc<SessionStore>,
    settings: RetrySettings,
}

impl RetryController {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        session: Arc<SessionStore>,
        settings: RetrySettings,
    ) -> Self {
        Self {
            retriever,
            session,
            settings,
        }
    }

    /// Attempt `url` until it succeeds, is not found, or retries run out.
    pub async fn run(&self, url: &Url, sink: &dyn ProgressSink) -> Settled {
        let mut attempts = 0;
        loop {
            let session = self.session.snapshot();
            let retrieval = self.retriever.retrieve(url, &session).await;
            attempts += 1;

            let key = match &retrieval {
                Retrieval::Failure(key) => key.clone(),
                _ => return Settled { retrieval, attempts },
            };

            sink.emit(EngineEvent::AttemptFailed {
                url: url.to_string(),
                attempt: attempts,
                key: key.clone(),
            });
            if attempts > self.settings.max_retries {
                return Settled { retrieval, attempts };
            }

            if key == FailureKey::AccessDenied {
                match self.session.refresh(session.version()).await {
                    Ok(next) if next.version() != session.version() => {
                        sink.emit(EngineEvent::SessionRefreshed {
                            version: next.version(),
                        });
                    }
                    Ok(_) => {}
                    Err(err) => mirror_error!("Session refresh failed: {}", err),
                }
            }

            let delay = self
                .settings
                .backoff
                .delay_for(attempts, rand::random::<f64>());
            mirror_warn!(
                "Attempt {} for {} failed with {}; retrying in {:?}",
                attempts,
                url,
                key,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
