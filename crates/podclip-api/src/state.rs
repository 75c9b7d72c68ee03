//! Application state.

use std::sync::Arc;

use podclip_worker::VideoProcessor;

use crate::config::ApiConfig;

/// Shared application state.
///
/// The processor and its collaborator clients are constructed once at
/// process start and shared by reference; no handler holds ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub processor: Arc<VideoProcessor>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let processor = VideoProcessor::from_env().await?;
        Ok(Self {
            config,
            processor: Arc::new(processor),
        })
    }
}
