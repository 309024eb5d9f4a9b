use lander_domain::repositories::training_api::TrainingApi;
use lander_domain::services::formatting::evaluation_summary;
use lander_domain::services::gate::{check_command, GateContext, Rejection};
use lander_domain::value_objects::command::{CommandKind, CommandOutcome};
use lander_domain::value_objects::notification::{Notification, Severity};
use lander_domain::value_objects::snapshot::Snapshot;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub id: u64,
    pub kind: CommandKind,
    pub weights_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandSettlement {
    pub id: u64,
    pub kind: CommandKind,
    pub outcome: CommandOutcome,
}

/// Single-flight gate for user commands.
#[derive(Debug, Default)]
pub struct CommandCoordinator {
    in_flight: Option<u64>,
    next_id: u64,
    last_recorded_video: Option<String>,
}

impl CommandCoordinator {
    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_recorded_video(&self) -> Option<&str> {
        self.last_recorded_video.as_deref()
    }

    /// Checks the precondition and, when it holds, marks a command in flight.
    pub fn begin(
        &mut self,
        kind: CommandKind,
        snapshot: Option<&Snapshot>,
        selected_weights: &str,
    ) -> Result<CommandRequest, Rejection> {
        check_command(
            kind,
            &GateContext {
                snapshot,
                selected_weights,
                in_flight: self.in_flight(),
            },
        )?;
        self.next_id += 1;
        self.in_flight = Some(self.next_id);
        let weights_file = (kind.requires_weights() && !selected_weights.is_empty())
            .then(|| selected_weights.to_string());
        info!(command = kind.as_str(), id = self.next_id, "command dispatched");
        Ok(CommandRequest {
            id: self.next_id,
            kind,
            weights_file,
        })
    }

    /// Releases the gate and maps the outcome to a notification.
    ///
    /// A settlement for a request that is no longer in flight is ignored.
    pub fn settle(&mut self, settlement: CommandSettlement) -> Option<Notification> {
        if self.in_flight != Some(settlement.id) {
            return None;
        }
        self.in_flight = None;
        if let CommandOutcome::Recorded { url } = &settlement.outcome {
            self.last_recorded_video = Some(url.clone());
        }
        let notification = notification_for(settlement.kind, &settlement.outcome);
        match notification.severity {
            Severity::Error => warn!(
                command = settlement.kind.as_str(),
                id = settlement.id,
                detail = %notification.message,
                "command failed"
            ),
            _ => info!(
                command = settlement.kind.as_str(),
                id = settlement.id,
                severity = notification.severity.as_str(),
                "command settled"
            ),
        }
        metrics::counter!(
            "lander.session.commands_total",
            "command" => settlement.kind.as_str(),
            "severity" => notification.severity.as_str()
        )
        .increment(1);
        Some(notification)
    }
}

pub fn notification_for(kind: CommandKind, outcome: &CommandOutcome) -> Notification {
    match (kind, outcome) {
        (_, CommandOutcome::Failed(err)) => {
            let action = match kind {
                CommandKind::Start => "starting training",
                CommandKind::Stop => "stopping training",
                CommandKind::Evaluate => "evaluating",
                CommandKind::RecordVideo => "recording video",
            };
            Notification::new(Severity::Error, format!("Error {action}: {err}"))
        }
        (CommandKind::Start, _) => Notification::new(Severity::Success, "Training started"),
        (CommandKind::Stop, _) => Notification::new(Severity::Info, "Stop signal sent"),
        (CommandKind::Evaluate, CommandOutcome::Evaluated { mean, scores }) => {
            Notification::new(Severity::Success, evaluation_summary(*mean, scores))
        }
        (CommandKind::Evaluate, _) => {
            Notification::new(Severity::Warning, "No agent available to evaluate")
        }
        (CommandKind::RecordVideo, CommandOutcome::Recorded { url }) => {
            Notification::new(Severity::Success, format!("Video recorded: {url}"))
        }
        (CommandKind::RecordVideo, _) => Notification::new(
            Severity::Warning,
            "Could not record video (agent not ready?)",
        ),
    }
}

/// Sends the request and folds every result into a `CommandOutcome`.
pub async fn execute<A: TrainingApi>(api: &A, request: &CommandRequest) -> CommandOutcome {
    let weights = request.weights_file.as_deref();
    match request.kind {
        CommandKind::Start => match api.post_start().await {
            Ok(_) => CommandOutcome::Acknowledged,
            Err(err) => CommandOutcome::Failed(err),
        },
        CommandKind::Stop => match api.post_stop().await {
            Ok(_) => CommandOutcome::Acknowledged,
            Err(err) => CommandOutcome::Failed(err),
        },
        CommandKind::Evaluate => match api.post_evaluate(weights).await {
            Ok(report) => CommandOutcome::from_evaluation(report),
            Err(err) => CommandOutcome::Failed(err),
        },
        CommandKind::RecordVideo => match api.post_record_video(weights).await {
            Ok(report) => CommandOutcome::from_recording(report, |path| api.resolve_media_url(path)),
            Err(err) => CommandOutcome::Failed(err),
        },
    }
}
