use lander_domain::repositories::training_api::ApiError;
use lander_domain::value_objects::snapshot::Snapshot;
use std::sync::Arc;

/// Issue-order position of one status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollTicket(u64);

impl PollTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct PollTicketIssuer {
    next: u64,
}

impl PollTicketIssuer {
    pub fn issue(&mut self) -> PollTicket {
        self.next += 1;
        PollTicket(self.next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTransition {
    Started,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Applied {
        transition: Option<RunTransition>,
        /// The store was unreachable before this snapshot arrived.
        recovered: bool,
    },
    Preserved {
        consecutive_failures: u32,
        became_unreachable: bool,
    },
    /// An equal or newer ticket was already applied.
    Stale,
}

/// Authoritative copy of the latest snapshot.
///
/// Only poll completions write here. A failed poll never touches `latest`,
/// so readers holding the previous `Arc` keep observing the same allocation.
#[derive(Debug)]
pub struct SnapshotStore {
    latest: Option<Arc<Snapshot>>,
    last_applied: Option<PollTicket>,
    consecutive_failures: u32,
    unreachable_after: u32,
    unreachable: bool,
}

impl SnapshotStore {
    pub fn new(unreachable_after: u32) -> Self {
        Self {
            latest: None,
            last_applied: None,
            consecutive_failures: 0,
            unreachable_after: unreachable_after.max(1),
            unreachable: false,
        }
    }

    pub fn latest(&self) -> Option<&Arc<Snapshot>> {
        self.latest.as_ref()
    }

    pub fn is_loading_initial(&self) -> bool {
        self.latest.is_none()
    }

    pub fn is_unreachable(&self) -> bool {
        self.unreachable
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn complete(&mut self, ticket: PollTicket, result: Result<Snapshot, ApiError>) -> PollOutcome {
        if self.last_applied.is_some_and(|applied| ticket <= applied) {
            return PollOutcome::Stale;
        }
        match result {
            Ok(snapshot) => {
                let was_running = self.latest.as_ref().map(|s| s.running);
                let transition = match (was_running, snapshot.running) {
                    (Some(true), false) => Some(RunTransition::Stopped),
                    (Some(false), true) => Some(RunTransition::Started),
                    _ => None,
                };
                let recovered = self.unreachable;
                self.latest = Some(Arc::new(snapshot));
                self.last_applied = Some(ticket);
                self.consecutive_failures = 0;
                self.unreachable = false;
                PollOutcome::Applied {
                    transition,
                    recovered,
                }
            }
            Err(_) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                let became_unreachable =
                    !self.unreachable && self.consecutive_failures >= self.unreachable_after;
                if became_unreachable {
                    self.unreachable = true;
                }
                PollOutcome::Preserved {
                    consecutive_failures: self.consecutive_failures,
                    became_unreachable,
                }
            }
        }
    }
}
