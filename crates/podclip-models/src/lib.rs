//! Shared data models for the podclipper backend.
//!
//! This crate provides Serde-serializable types for:
//! - Word-level transcript spans
//! - LLM-proposed clip moments
//! - Face tracks and talking scores from speaker detection
//! - Clip jobs and output configuration
//! - Encoding configuration

pub mod encoding;
pub mod job;
pub mod moment;
pub mod track;
pub mod transcript;

// Re-export common types
pub use encoding::EncodingConfig;
pub use job::{ClipJob, DecodePolicy, OutputConfig};
pub use moment::{Moment, MAX_CLIP_SECS, MIN_CLIP_SECS};
pub use track::{FaceObservation, FaceTrack, ProcTrack};
pub use transcript::WordSpan;
