//! FFmpeg CLI wrapper and clip rendering primitives.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and execution
//! - Segment cutting, audio extraction, muxing and subtitle burn-in
//! - The vertical reframing engine (crop-or-letterbox per frame)
//! - The word-level karaoke subtitle compiler (ASS output)
//! - The speaker-detection collaborator boundary

pub mod command;
pub mod detection;
pub mod error;
pub mod ops;
pub mod reframe;
pub mod subtitle;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner, RawVideoSink};
pub use detection::{DetectionArtifacts, SpeakerDetection, TalkNetDetector};
pub use error::{MediaError, MediaResult};
pub use ops::{burn_subtitles, cut_segment, extract_audio, mux_audio_video};
pub use reframe::render_vertical;
pub use subtitle::{compile_subtitles, AssDocument};
