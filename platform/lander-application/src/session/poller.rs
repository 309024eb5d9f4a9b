use crate::session::runtime::Publisher;
use crate::session::store::PollTicketIssuer;
use crate::session::SessionEvent;
use lander_domain::repositories::training_api::TrainingApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Upper bound on status requests outstanding at once.
pub const MAX_POLLS_IN_FLIGHT: usize = 4;

/// Periodic `fetch_status` driver.
///
/// Each tick issues a ticket and spawns one request; completions are
/// published in whatever order they finish and the session drops stale ones.
pub struct StatusPoller {
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn spawn<A: TrainingApi>(api: Arc<A>, period: Duration, publisher: Publisher) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut issuer = PollTicketIssuer::default();
            let mut in_flight: JoinSet<()> = JoinSet::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if publisher.is_disposed() {
                            break;
                        }
                        if in_flight.len() >= MAX_POLLS_IN_FLIGHT {
                            debug!(in_flight = in_flight.len(), "poll tick skipped");
                            metrics::counter!("lander.session.polls_skipped_total").increment(1);
                            continue;
                        }
                        let ticket = issuer.issue();
                        let api = Arc::clone(&api);
                        let publisher = publisher.clone();
                        in_flight.spawn(async move {
                            let result = api.fetch_status().await;
                            publisher.publish(SessionEvent::PollCompleted { ticket, result });
                        });
                    }
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Cancels the timer and every outstanding poll.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Periodic `GET /health`, first check one period after spawn.
pub struct HealthMonitor {
    handle: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    pub fn spawn<A: TrainingApi>(api: Arc<A>, period: Duration, publisher: Publisher) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if publisher.is_disposed() {
                    break;
                }
                let result = api.fetch_health().await;
                publisher.publish(SessionEvent::HealthChecked(result));
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
