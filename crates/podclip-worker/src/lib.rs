//! Clip rendering pipeline controller.
//!
//! Composes the moment-selection orchestrator, the reframing engine and the
//! karaoke subtitle compiler with the external collaborators (transcription,
//! speaker detection, object storage, FFmpeg) into a per-clip sequence:
//! cut, extract audio, detect speakers, reframe, subtitle, mux, upload.

pub mod config;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod moments;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use gemini::{GeminiClient, GenerateText, LlmError};
pub use logging::RunLogger;
pub use moments::MomentSelector;
pub use processor::{jobs_from_moments, ProcessRequest, ProcessSummary, VideoProcessor};
