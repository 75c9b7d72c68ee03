//! Request handlers.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use podclip_models::{DecodePolicy, OutputConfig};
use podclip_worker::{ProcessRequest, ProcessSummary};

use crate::error::ApiError;
use crate::state::AppState;

/// Clip configuration accepted from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClipConfig {
    /// Topic prompt for moment selection.
    pub prompt: String,
    /// Maximum number of clips to produce.
    #[serde(default = "default_clip_count")]
    pub clip_count: usize,
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    #[serde(default = "default_target_height")]
    pub target_height: u32,
    /// Whether to burn karaoke subtitles.
    #[serde(default = "default_subtitle")]
    pub subtitle: bool,
}

fn default_clip_count() -> usize {
    3
}
fn default_target_width() -> u32 {
    podclip_models::job::DEFAULT_TARGET_WIDTH
}
fn default_target_height() -> u32 {
    podclip_models::job::DEFAULT_TARGET_HEIGHT
}
fn default_subtitle() -> bool {
    true
}

/// The process-video request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessVideoRequest {
    /// Object storage key of the source video.
    pub storage_path: String,
    pub config: ClipConfig,
}

/// Run the full pipeline for one video. Synchronous and long-running; the
/// response carries the uploaded clip keys.
pub async fn process_video(
    State(state): State<AppState>,
    Json(request): Json<ProcessVideoRequest>,
) -> Result<Json<ProcessSummary>, ApiError> {
    if request.storage_path.trim().is_empty() {
        return Err(ApiError::BadRequest("storage_path must not be empty".into()));
    }
    if request.config.target_width == 0 || request.config.target_height == 0 {
        return Err(ApiError::BadRequest(
            "target dimensions must be positive".into(),
        ));
    }
    if request.config.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".into()));
    }

    info!(
        storage_path = %request.storage_path,
        clip_count = request.config.clip_count,
        "Accepted processing request"
    );

    let output = OutputConfig {
        target_width: request.config.target_width,
        target_height: request.config.target_height,
        subtitle: request.config.subtitle,
        decode_policy: DecodePolicy::Drop,
        ..OutputConfig::default()
    };

    let summary = state
        .processor
        .process_video(ProcessRequest {
            storage_path: request.storage_path,
            topic_prompt: request.config.prompt,
            clip_count: request.config.clip_count,
            output,
        })
        .await?;

    Ok(Json(summary))
}

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let body = r#"{"storage_path": "test/a.mp4", "config": {"prompt": "football"}}"#;
        let request: ProcessVideoRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.config.clip_count, 3);
        assert_eq!(request.config.target_width, 1080);
        assert_eq!(request.config.target_height, 1920);
        assert!(request.config.subtitle);
    }

    #[test]
    fn test_request_overrides() {
        let body = r#"{
            "storage_path": "test/a.mp4",
            "config": {"prompt": "football", "clip_count": 1, "subtitle": false}
        }"#;
        let request: ProcessVideoRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.config.clip_count, 1);
        assert!(!request.config.subtitle);
    }
}
