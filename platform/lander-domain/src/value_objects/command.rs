use crate::repositories::training_api::ApiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Start,
    Stop,
    Evaluate,
    RecordVideo,
}

impl CommandKind {
    pub const ALL: [CommandKind; 4] = [
        CommandKind::Start,
        CommandKind::Stop,
        CommandKind::Evaluate,
        CommandKind::RecordVideo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Start => "start",
            CommandKind::Stop => "stop",
            CommandKind::Evaluate => "evaluate",
            CommandKind::RecordVideo => "record_video",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CommandKind::Start => "Start Training",
            CommandKind::Stop => "Stop",
            CommandKind::Evaluate => "Evaluate",
            CommandKind::RecordVideo => "Record Video",
        }
    }

    pub fn requires_weights(self) -> bool {
        matches!(self, CommandKind::Evaluate | CommandKind::RecordVideo)
    }
}

/// Response of `POST /train/evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub ok: bool,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub scores: Vec<f64>,
}

/// Response of `POST /train/video`. `path` is server-relative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingReport {
    pub ok: bool,
    #[serde(default)]
    pub path: Option<String>,
}

/// How a dispatched command settled.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Start/stop acknowledged. The job state is confirmed by a later poll.
    Acknowledged,
    Evaluated {
        mean: f64,
        scores: Vec<f64>,
    },
    /// Recording finished; `url` is already absolute.
    Recorded {
        url: String,
    },
    /// Well-formed response saying the operation could not be performed.
    Declined,
    Failed(ApiError),
}

impl CommandOutcome {
    pub fn from_evaluation(report: EvaluationReport) -> Self {
        match (report.ok, report.mean) {
            (true, Some(mean)) => CommandOutcome::Evaluated {
                mean,
                scores: report.scores,
            },
            _ => CommandOutcome::Declined,
        }
    }

    pub fn from_recording(report: RecordingReport, resolve: impl FnOnce(&str) -> String) -> Self {
        match report.path.as_deref() {
            Some(path) if report.ok && !path.trim().is_empty() => CommandOutcome::Recorded {
                url: resolve(path),
            },
            _ => CommandOutcome::Declined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandKind, CommandOutcome, EvaluationReport, RecordingReport};

    #[test]
    fn evaluation_without_ok_is_declined() {
        let report: EvaluationReport = serde_json::from_str(r#"{"ok":false}"#).expect("report");
        assert_eq!(
            CommandOutcome::from_evaluation(report),
            CommandOutcome::Declined
        );
    }

    #[test]
    fn evaluation_with_scores_is_evaluated() {
        let report: EvaluationReport =
            serde_json::from_str(r#"{"ok":true,"mean":201.25,"scores":[200.0,202.5]}"#)
                .expect("report");
        assert_eq!(
            CommandOutcome::from_evaluation(report),
            CommandOutcome::Evaluated {
                mean: 201.25,
                scores: vec![200.0, 202.5]
            }
        );
    }

    #[test]
    fn recording_without_path_is_declined() {
        let report = RecordingReport {
            ok: true,
            path: None,
        };
        let outcome = CommandOutcome::from_recording(report, |p| p.to_string());
        assert_eq!(outcome, CommandOutcome::Declined);
    }

    #[test]
    fn recording_resolves_path() {
        let report = RecordingReport {
            ok: true,
            path: Some("/videos/ep12.mp4".to_string()),
        };
        let outcome =
            CommandOutcome::from_recording(report, |p| format!("http://host:8000{p}"));
        assert_eq!(
            outcome,
            CommandOutcome::Recorded {
                url: "http://host:8000/videos/ep12.mp4".to_string()
            }
        );
    }

    #[test]
    fn only_evaluate_and_record_need_weights() {
        let needing: Vec<_> = CommandKind::ALL
            .into_iter()
            .filter(|k| k.requires_weights())
            .collect();
        assert_eq!(needing, vec![CommandKind::Evaluate, CommandKind::RecordVideo]);
    }
}
