use crate::value_objects::command::{EvaluationReport, RecordingReport};
use crate::value_objects::snapshot::Snapshot;
use crate::value_objects::video::VideoDescriptor;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Network failure or timeout.
    Transport(String),
    /// The response did not have the expected shape.
    Protocol(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport",
            ApiError::Protocol(_) => "protocol",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Transport(msg) => write!(f, "transport: {msg}"),
            ApiError::Protocol(msg) => write!(f, "protocol: {msg}"),
        }
    }
}

/// Request/response surface of the remote training service.
///
/// Implementations do not retry; a failed call is reported once and the
/// caller decides what to do with it.
pub trait TrainingApi: Send + Sync + 'static {
    fn fetch_health(&self) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;

    fn fetch_status(&self) -> impl Future<Output = Result<Snapshot, ApiError>> + Send;

    fn post_start(&self) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;

    fn post_stop(&self) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;

    fn post_evaluate(
        &self,
        weights_file: Option<&str>,
    ) -> impl Future<Output = Result<EvaluationReport, ApiError>> + Send;

    fn post_record_video(
        &self,
        weights_file: Option<&str>,
    ) -> impl Future<Output = Result<RecordingReport, ApiError>> + Send;

    fn list_weights(&self) -> impl Future<Output = Result<Vec<String>, ApiError>> + Send;

    fn list_videos(&self) -> impl Future<Output = Result<Vec<VideoDescriptor>, ApiError>> + Send;

    /// Turns a server-relative media path into an absolute playable URL.
    fn resolve_media_url(&self, path: &str) -> String;
}
