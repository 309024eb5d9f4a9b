use lander_application::config::Config;
use lander_application::session::commands::{execute, CommandCoordinator, CommandSettlement};
use lander_domain::repositories::training_api::{ApiError, TrainingApi};
use lander_domain::services::formatting::bytes_to_human;
use lander_domain::services::gate::{ActionAvailability, GateContext, Rejection};
use lander_domain::services::history::reward_trend;
use lander_domain::value_objects::command::{CommandKind, CommandOutcome};
use lander_domain::value_objects::notification::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessMode {
    Health,
    Status,
    Start,
    Stop,
    Evaluate,
    Video,
    Weights,
    Videos,
}

impl HeadlessMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HeadlessMode::Health => "health",
            HeadlessMode::Status => "status",
            HeadlessMode::Start => "start",
            HeadlessMode::Stop => "stop",
            HeadlessMode::Evaluate => "evaluate",
            HeadlessMode::Video => "video",
            HeadlessMode::Weights => "weights",
            HeadlessMode::Videos => "videos",
        }
    }

    fn command(self) -> Option<CommandKind> {
        match self {
            HeadlessMode::Start => Some(CommandKind::Start),
            HeadlessMode::Stop => Some(CommandKind::Stop),
            HeadlessMode::Evaluate => Some(CommandKind::Evaluate),
            HeadlessMode::Video => Some(CommandKind::RecordVideo),
            _ => None,
        }
    }
}

pub struct HeadlessArgs {
    pub mode: HeadlessMode,
    /// Weights file for evaluate/video; the first listed one when absent.
    pub weights: Option<String>,
}

#[derive(Debug)]
pub struct HeadlessOutput {
    pub json: serde_json::Value,
    pub warning: bool,
}

impl HeadlessOutput {
    fn ok(json: serde_json::Value) -> Self {
        Self {
            json,
            warning: false,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.warning {
            3
        } else {
            0
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum HeadlessError {
    Rejected(Rejection),
    Failed(String),
}

impl HeadlessError {
    pub fn exit_code(&self) -> i32 {
        match self {
            HeadlessError::Rejected(_) => 2,
            HeadlessError::Failed(_) => 1,
        }
    }
}

impl std::fmt::Display for HeadlessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadlessError::Rejected(rejection) => write!(f, "command rejected: {rejection}"),
            HeadlessError::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

fn failed(context: &str) -> impl FnOnce(ApiError) -> HeadlessError + '_ {
    move |err| HeadlessError::Failed(format!("{context}: {err}"))
}

pub fn run_headless(config: &Config, args: HeadlessArgs) -> Result<HeadlessOutput, HeadlessError> {
    let client = crate::bootstrap::build_client(config).map_err(HeadlessError::Failed)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| HeadlessError::Failed(format!("failed to init tokio runtime: {err}")))?;
    runtime.block_on(run_mode(&client, &args))
}

pub async fn run_mode<A: TrainingApi>(
    api: &A,
    args: &HeadlessArgs,
) -> Result<HeadlessOutput, HeadlessError> {
    let mode = args.mode.as_str();
    match args.mode {
        HeadlessMode::Health => {
            let health = api.fetch_health().await.map_err(failed("health check failed"))?;
            Ok(HeadlessOutput::ok(serde_json::json!({
                "status": "ok",
                "mode": mode,
                "health": health,
            })))
        }
        HeadlessMode::Status => {
            let snapshot = api.fetch_status().await.map_err(failed("status poll failed"))?;
            let selected = match selected_weights(api, args.weights.as_deref()).await {
                Ok(selected) => selected,
                Err(err) => {
                    tracing::warn!(error = %err, "weights listing failed; reporting without a selection");
                    String::new()
                }
            };
            let actions = ActionAvailability::from_context(&GateContext {
                snapshot: Some(&snapshot),
                selected_weights: &selected,
                in_flight: false,
            });
            Ok(HeadlessOutput::ok(serde_json::json!({
                "status": "ok",
                "mode": mode,
                "reward_trend": reward_trend(&snapshot.history_tail),
                "weights_file": (!selected.is_empty()).then_some(selected.as_str()),
                "actions": actions,
                "snapshot": snapshot,
            })))
        }
        HeadlessMode::Weights => {
            let weights = api.list_weights().await.map_err(failed("weights listing failed"))?;
            Ok(HeadlessOutput::ok(serde_json::json!({
                "status": "ok",
                "mode": mode,
                "weights": weights,
            })))
        }
        HeadlessMode::Videos => {
            let videos = api.list_videos().await.map_err(failed("video listing failed"))?;
            let videos: Vec<serde_json::Value> = videos
                .iter()
                .map(|video| {
                    serde_json::json!({
                        "name": video.name,
                        "url": api.resolve_media_url(&video.url),
                        "size": bytes_to_human(video.size_bytes),
                        "size_bytes": video.size_bytes,
                        "modified": video.modified_at().map(|at| at.to_rfc3339()),
                    })
                })
                .collect();
            Ok(HeadlessOutput::ok(serde_json::json!({
                "status": "ok",
                "mode": mode,
                "videos": videos,
            })))
        }
        HeadlessMode::Start | HeadlessMode::Stop | HeadlessMode::Evaluate | HeadlessMode::Video => {
            let Some(kind) = args.mode.command() else {
                return Err(HeadlessError::Failed(format!("{mode} is not a command")));
            };
            run_command(api, kind, args.weights.as_deref()).await
        }
    }
}

/// `--weights` when given, otherwise the first listed file, as the TUI selects it.
async fn selected_weights<A: TrainingApi>(
    api: &A,
    explicit: Option<&str>,
) -> Result<String, HeadlessError> {
    if let Some(weights) = explicit {
        return Ok(weights.to_string());
    }
    Ok(api
        .list_weights()
        .await
        .map_err(failed("weights listing failed"))?
        .into_iter()
        .next()
        .unwrap_or_default())
}

async fn run_command<A: TrainingApi>(
    api: &A,
    kind: CommandKind,
    weights: Option<&str>,
) -> Result<HeadlessOutput, HeadlessError> {
    let snapshot = api.fetch_status().await.map_err(failed("status poll failed"))?;
    let selected = if kind.requires_weights() {
        selected_weights(api, weights).await?
    } else {
        String::new()
    };

    let mut coordinator = CommandCoordinator::default();
    let request = coordinator
        .begin(kind, Some(&snapshot), &selected)
        .map_err(HeadlessError::Rejected)?;
    let outcome = execute(api, &request).await;

    let mut json = serde_json::json!({
        "mode": kind.as_str(),
        "weights_file": request.weights_file,
    });
    match &outcome {
        CommandOutcome::Evaluated { mean, scores } => {
            json["mean"] = serde_json::json!(mean);
            json["scores"] = serde_json::json!(scores);
        }
        CommandOutcome::Recorded { url } => {
            json["url"] = serde_json::json!(url);
        }
        _ => {}
    }

    let notification = coordinator
        .settle(CommandSettlement {
            id: request.id,
            kind,
            outcome,
        })
        .ok_or_else(|| HeadlessError::Failed("command settled twice".to_string()))?;
    if notification.severity == Severity::Error {
        return Err(HeadlessError::Failed(notification.message));
    }

    let warning = notification.severity == Severity::Warning;
    json["status"] = serde_json::json!(if warning { "warning" } else { "ok" });
    json["severity"] = serde_json::json!(notification.severity);
    json["message"] = serde_json::json!(notification.message);
    Ok(HeadlessOutput { json, warning })
}
