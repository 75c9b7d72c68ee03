//! Worker configuration.

use std::time::Duration;

use crate::moments::{DEFAULT_MAX_RETRIES_PER_MODEL, DEFAULT_MODEL_TIERS, DEFAULT_RETRY_DELAY};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for per-run temporary files
    pub work_dir: String,
    /// Hard cap on clips per run, applied after the request's clip count
    pub max_clips: usize,
    /// Ordered model tier ladder for moment selection
    pub model_tiers: Vec<String>,
    /// Attempts per model tier
    pub max_retries_per_model: u32,
    /// Fixed delay between attempts within a tier
    pub retry_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/podclip".to_string(),
            max_clips: 5,
            model_tiers: DEFAULT_MODEL_TIERS.iter().map(|s| s.to_string()).collect(),
            max_retries_per_model: DEFAULT_MAX_RETRIES_PER_MODEL,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            max_clips: std::env::var("WORKER_MAX_CLIPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_clips),
            model_tiers: std::env::var("WORKER_MODEL_TIERS")
                .map(|s| {
                    s.split(',')
                        .map(|m| m.trim().to_string())
                        .filter(|m| !m.is_empty())
                        .collect()
                })
                .ok()
                .filter(|tiers: &Vec<String>| !tiers.is_empty())
                .unwrap_or(defaults.model_tiers),
            max_retries_per_model: std::env::var("WORKER_MODEL_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries_per_model),
            retry_delay: std::env::var("WORKER_MODEL_RETRY_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
        }
    }
}
