use crate::config::Config;
use crate::session::commands::{execute, CommandRequest, CommandSettlement};
use crate::session::poller::{HealthMonitor, StatusPoller};
use crate::session::{Followup, SessionEvent};
use lander_domain::repositories::training_api::{ApiError, TrainingApi};
use lander_domain::value_objects::command::{CommandKind, CommandOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Sending half of the session event channel.
///
/// Once disposed nothing is delivered any more, even from tasks that are
/// still finishing.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: UnboundedSender<SessionEvent>,
    disposed: Arc<AtomicBool>,
}

impl Publisher {
    pub fn new(tx: UnboundedSender<SessionEvent>) -> Self {
        Self {
            tx,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn publish(&self, event: SessionEvent) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub status_interval: Duration,
    pub health_interval: Duration,
}

impl RuntimeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            status_interval: config.status_interval(),
            health_interval: config.health_interval(),
        }
    }
}

/// Publishes a settlement for its command exactly once, also when the
/// request task is cancelled or panics before it finishes.
struct SettleGuard {
    publisher: Publisher,
    id: u64,
    kind: CommandKind,
    settled: bool,
}

impl SettleGuard {
    fn new(publisher: Publisher, request: &CommandRequest) -> Self {
        Self {
            publisher,
            id: request.id,
            kind: request.kind,
            settled: false,
        }
    }

    fn settle(mut self, outcome: CommandOutcome) {
        self.settled = true;
        self.publisher
            .publish(SessionEvent::CommandSettled(CommandSettlement {
                id: self.id,
                kind: self.kind,
                outcome,
            }));
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.publisher
            .publish(SessionEvent::CommandSettled(CommandSettlement {
                id: self.id,
                kind: self.kind,
                outcome: CommandOutcome::Failed(ApiError::Transport(
                    "request cancelled".to_string(),
                )),
            }));
    }
}

/// Async side of a session: owns the background tasks and executes the
/// followups the `Session` state machine asks for.
///
/// Must be started from inside a tokio runtime.
pub struct SessionRuntime<A: TrainingApi> {
    api: Arc<A>,
    publisher: Publisher,
    poller: StatusPoller,
    health: HealthMonitor,
    tasks: Vec<JoinHandle<()>>,
}

impl<A: TrainingApi> SessionRuntime<A> {
    pub fn start(api: Arc<A>, settings: RuntimeSettings, tx: UnboundedSender<SessionEvent>) -> Self {
        let publisher = Publisher::new(tx);
        let poller = StatusPoller::spawn(Arc::clone(&api), settings.status_interval, publisher.clone());
        let health = HealthMonitor::spawn(Arc::clone(&api), settings.health_interval, publisher.clone());
        Self {
            api,
            publisher,
            poller,
            health,
            tasks: Vec::new(),
        }
    }

    pub fn perform(&mut self, followup: Followup) {
        if self.publisher.is_disposed() {
            return;
        }
        self.tasks.retain(|handle| !handle.is_finished());
        let api = Arc::clone(&self.api);
        let publisher = self.publisher.clone();
        let handle = match followup {
            Followup::RefreshWeights => tokio::spawn(async move {
                let result = api.list_weights().await;
                publisher.publish(SessionEvent::WeightsListed(result));
            }),
            Followup::RefreshVideos => tokio::spawn(async move {
                let result = api.list_videos().await;
                publisher.publish(SessionEvent::VideosListed(result));
            }),
            Followup::CheckHealth => tokio::spawn(async move {
                let result = api.fetch_health().await;
                publisher.publish(SessionEvent::HealthChecked(result));
            }),
            Followup::Dispatch(request) => tokio::spawn(async move {
                let guard = SettleGuard::new(publisher, &request);
                let outcome = execute(api.as_ref(), &request).await;
                guard.settle(outcome);
            }),
        };
        self.tasks.push(handle);
    }

    pub fn perform_all(&mut self, followups: impl IntoIterator<Item = Followup>) {
        for followup in followups {
            self.perform(followup);
        }
    }

    /// Stops the timers and aborts outstanding requests. Idempotent.
    pub fn shutdown(&mut self) {
        self.publisher.dispose();
        self.poller.shutdown();
        self.health.shutdown();
        for handle in self.tasks.drain(..) {
            handle.abort();
        }
    }
}

impl<A: TrainingApi> Drop for SessionRuntime<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
