pub mod catalog;
pub mod commands;
pub mod poller;
pub mod runtime;
pub mod store;
pub mod view;

use crate::session::catalog::AssetCatalog;
use crate::session::commands::{CommandCoordinator, CommandRequest, CommandSettlement};
use crate::session::store::{PollOutcome, PollTicket, RunTransition, SnapshotStore};
use crate::session::view::{DerivedView, SessionStateView};
use lander_domain::repositories::training_api::ApiError;
use lander_domain::services::gate::{ActionAvailability, Rejection};
use lander_domain::value_objects::command::{CommandKind, CommandOutcome};
use lander_domain::value_objects::notification::Notification;
use lander_domain::value_objects::snapshot::Snapshot;
use lander_domain::value_objects::video::VideoDescriptor;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything background tasks report back to the session owner.
#[derive(Debug)]
pub enum SessionEvent {
    PollCompleted {
        ticket: PollTicket,
        result: Result<Snapshot, ApiError>,
    },
    HealthChecked(Result<serde_json::Value, ApiError>),
    WeightsListed(Result<Vec<String>, ApiError>),
    VideosListed(Result<Vec<VideoDescriptor>, ApiError>),
    CommandSettled(CommandSettlement),
}

/// Side effects the session asks its driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Followup {
    RefreshWeights,
    RefreshVideos,
    CheckHealth,
    Dispatch(CommandRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Unknown,
    Online,
    Offline,
}

impl Connectivity {
    pub fn label(self) -> &'static str {
        match self {
            Connectivity::Unknown => "Connecting",
            Connectivity::Online => "Backend OK",
            Connectivity::Offline => "Offline",
        }
    }
}

/// Client-side state of one monitoring session.
///
/// Sans-IO: it consumes `SessionEvent`s and user requests and returns the
/// followups a driver has to execute. Nothing here awaits.
#[derive(Debug)]
pub struct Session {
    store: SnapshotStore,
    view: SessionStateView,
    coordinator: CommandCoordinator,
    catalog: AssetCatalog,
    connectivity: Connectivity,
    notification: Option<Notification>,
    closed: bool,
}

impl Session {
    pub fn new(unreachable_after: u32) -> Self {
        Self {
            store: SnapshotStore::new(unreachable_after),
            view: SessionStateView::default(),
            coordinator: CommandCoordinator::default(),
            catalog: AssetCatalog::default(),
            connectivity: Connectivity::Unknown,
            notification: None,
            closed: false,
        }
    }

    pub fn startup(&self) -> Vec<Followup> {
        vec![
            Followup::CheckHealth,
            Followup::RefreshWeights,
            Followup::RefreshVideos,
        ]
    }

    pub fn refresh(&self) -> Vec<Followup> {
        if self.closed {
            return Vec::new();
        }
        vec![Followup::RefreshWeights, Followup::RefreshVideos]
    }

    pub fn apply(&mut self, event: SessionEvent) -> Vec<Followup> {
        if self.closed {
            return Vec::new();
        }
        match event {
            SessionEvent::PollCompleted { ticket, result } => self.apply_poll(ticket, result),
            SessionEvent::HealthChecked(result) => {
                match result {
                    Ok(_) => self.connectivity = Connectivity::Online,
                    Err(err) => {
                        debug!(error = %err, "health check failed");
                        self.connectivity = Connectivity::Offline;
                    }
                }
                Vec::new()
            }
            SessionEvent::WeightsListed(result) => {
                match result {
                    Ok(weights) => self.catalog.replace_weights(weights),
                    Err(err) => warn!(error = %err, "weights listing failed"),
                }
                Vec::new()
            }
            SessionEvent::VideosListed(result) => {
                match result {
                    Ok(videos) => self.catalog.replace_videos(videos),
                    Err(err) => warn!(error = %err, "video listing failed"),
                }
                Vec::new()
            }
            SessionEvent::CommandSettled(settlement) => {
                let recorded = matches!(settlement.outcome, CommandOutcome::Recorded { .. });
                if let Some(notification) = self.coordinator.settle(settlement) {
                    self.notification = Some(notification);
                }
                if recorded {
                    vec![Followup::RefreshVideos]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn apply_poll(&mut self, ticket: PollTicket, result: Result<Snapshot, ApiError>) -> Vec<Followup> {
        if let Err(err) = &result {
            debug!(ticket = ticket.value(), error = %err, "status poll failed");
        }
        let outcome = self.store.complete(ticket, result);
        let mut followups = Vec::new();
        let label = match outcome {
            PollOutcome::Applied {
                transition,
                recovered,
            } => {
                self.view.sync(self.store.latest());
                if transition == Some(RunTransition::Stopped) {
                    info!("training stopped, refreshing weights");
                    followups.push(Followup::RefreshWeights);
                }
                if recovered {
                    followups.push(Followup::CheckHealth);
                }
                "applied"
            }
            PollOutcome::Preserved {
                consecutive_failures,
                became_unreachable,
            } => {
                if became_unreachable {
                    warn!(consecutive_failures, "status endpoint unreachable");
                    followups.push(Followup::CheckHealth);
                }
                "preserved"
            }
            PollOutcome::Stale => "stale",
        };
        metrics::counter!("lander.session.polls_total", "result" => label).increment(1);
        followups
    }

    /// Gates a user command; on success the caller must perform the
    /// returned `Followup::Dispatch`.
    pub fn request(&mut self, kind: CommandKind) -> Result<Followup, Rejection> {
        if self.closed {
            return Err(Rejection::Busy);
        }
        let snapshot = self.store.latest().map(|s| s.as_ref());
        let request = self
            .coordinator
            .begin(kind, snapshot, self.catalog.selected_weights())?;
        Ok(Followup::Dispatch(request))
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.store.latest()
    }

    pub fn is_loading_initial(&self) -> bool {
        self.store.is_loading_initial()
    }

    pub fn is_unreachable(&self) -> bool {
        self.store.is_unreachable()
    }

    pub fn derived(&self) -> &DerivedView {
        self.view.derived()
    }

    pub fn view_recomputations(&self) -> u64 {
        self.view.recomputations()
    }

    pub fn availability(&self) -> ActionAvailability {
        self.view
            .availability(self.catalog.selected_weights(), self.coordinator.in_flight())
    }

    pub fn in_flight(&self) -> bool {
        self.coordinator.in_flight()
    }

    pub fn last_recorded_video(&self) -> Option<&str> {
        self.coordinator.last_recorded_video()
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut AssetCatalog {
        &mut self.catalog
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }
}
