use std::sync::Arc;
use std::time::Duration;

use mirror_core::{FailureKey, Outcome, RunState, TargetUrl};
use mirror_logging::{mirror_debug, mirror_error, mirror_info, mirror_warn};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::persist::AssetWriter;
use crate::retry::{RetryController, RetrySettings};
use crate::session::SessionStore;
use crate::{EngineEvent, Retrieval, Retriever};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub max_concurrency: usize,
    /// Upper bound of the random pause taken before each task starts.
    pub request_delay: Duration,
    pub retry: RetrySettings,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            request_delay: Duration::ZERO,
            retry: RetrySettings::default(),
        }
    }
}

/// Runs every target through retry and persistence with bounded concurrency.
///
/// Tasks only report through events; the loop in [`Scheduler::run`] is the
/// single writer of the [`RunState`].
pub struct Scheduler {
    controller: Arc<RetryController>,
    writer: AssetWriter,
    settings: SchedulerSettings,
}

impl Scheduler {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        session: Arc<SessionStore>,
        writer: AssetWriter,
        settings: SchedulerSettings,
    ) -> Self {
        let controller = Arc::new(RetryController::new(retriever, session, settings.retry));
        Self {
            controller,
            writer,
            settings,
        }
    }

    pub async fn run(&self, targets: &[TargetUrl]) -> RunState {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(
            targets.to_vec(),
            self.controller.clone(),
            self.writer.clone(),
            self.settings.clone(),
            tx,
        ));

        let mut state = RunState::new();
        while let Some(event) = rx.recv().await {
            observe(&mut state, event);
        }
        if let Err(err) = dispatcher.await {
            mirror_error!("Dispatcher stopped early: {}", err);
        }

        for target in targets {
            if state.bucket_of(target.as_str()).is_none() {
                mirror_error!("{} never settled", target);
                state.record(
                    target.as_str(),
                    &Outcome::Failed(FailureKey::reason("TASK_ABORTED")),
                );
            }
        }
        state
    }
}

/// Admit tasks in input order as permits free up.
async fn dispatch(
    targets: Vec<TargetUrl>,
    controller: Arc<RetryController>,
    writer: AssetWriter,
    settings: SchedulerSettings,
    tx: mpsc::UnboundedSender<EngineEvent>,
) {
    let limiter = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
    let total = targets.len();
    let mut tasks = JoinSet::new();

    for (index, target) in targets.into_iter().enumerate() {
        let Ok(permit) = limiter.clone().acquire_owned().await else {
            break;
        };
        let controller = controller.clone();
        let writer = writer.clone();
        let sink = ChannelProgressSink::new(tx.clone());
        let request_delay = settings.request_delay;

        tasks.spawn(async move {
            let _permit = permit;
            if !request_delay.is_zero() {
                tokio::time::sleep(request_delay.mul_f64(rand::random::<f64>())).await;
            }
            sink.emit(EngineEvent::TaskStarted {
                index: index + 1,
                total,
                url: target.to_string(),
            });

            let (outcome, attempts) = match target.to_url() {
                Ok(url) => {
                    let settled = controller.run(&url, &sink).await;
                    let outcome = match settled.retrieval {
                        Retrieval::Success(body) => persist(&writer, url, body.bytes).await,
                        Retrieval::NotFound => Outcome::NotFound,
                        Retrieval::Failure(key) => Outcome::Failed(key),
                    };
                    (outcome, settled.attempts)
                }
                Err(err) => {
                    mirror_warn!("{}", err);
                    (Outcome::Failed(FailureKey::reason("INVALID_URL")), 0)
                }
            };
            sink.emit(EngineEvent::Settled {
                url: target.into_string(),
                outcome,
                attempts,
            });
        });
    }
    drop(tx);

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            mirror_error!("Task failed: {}", err);
        }
    }
}

async fn persist(writer: &AssetWriter, url: url::Url, bytes: bytes::Bytes) -> Outcome {
    let writer = writer.clone();
    let target = url.clone();
    match tokio::task::spawn_blocking(move || writer.write(&target, &bytes)).await {
        Ok(Ok(path)) => {
            mirror_debug!("Saved {} to {}", url, path.display());
            Outcome::Success
        }
        Ok(Err(err)) => {
            mirror_error!("Failed to save {}: {}", url, err);
            Outcome::Failed(FailureKey::reason("WRITE_ERROR"))
        }
        Err(err) => {
            mirror_error!("Failed to save {}: {}", url, err);
            Outcome::Failed(FailureKey::reason("WRITE_ERROR"))
        }
    }
}

fn observe(state: &mut RunState, event: EngineEvent) {
    match event {
        EngineEvent::TaskStarted { index, total, url } => {
            mirror_info!("[{}/{}] start: {}", index, total, url);
        }
        EngineEvent::AttemptFailed { url, attempt, key } => {
            mirror_debug!("{} attempt {} failed: {}", url, attempt, key);
        }
        EngineEvent::SessionRefreshed { version } => {
            mirror_info!("Session now at version {}", version);
        }
        EngineEvent::Settled {
            url,
            outcome,
            attempts,
        } => {
            match &outcome {
                Outcome::Success => mirror_info!("Downloaded {}", url),
                Outcome::NotFound => mirror_warn!("Not found: {}", url),
                Outcome::Failed(key) => {
                    mirror_error!("Giving up on {} after {} attempt(s): {}", url, attempts, key)
                }
            }
            state.record(&url, &outcome);
        }
    }
}
