//! Clip jobs and output configuration.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::moment::Moment;
use crate::transcript::WordSpan;
use crate::EncodingConfig;

/// Default vertical output width.
pub const DEFAULT_TARGET_WIDTH: u32 = 1080;
/// Default vertical output height.
pub const DEFAULT_TARGET_HEIGHT: u32 = 1920;
/// Default output framerate.
pub const DEFAULT_FPS: u32 = 25;
/// Default maximum words per subtitle line.
pub const DEFAULT_MAX_WORDS: usize = 5;

/// What to do when a source frame fails to decode during reframing.
///
/// Dropping a frame silently can shift audio/video sync, so the policy is
/// explicit rather than assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Skip the frame and continue.
    #[default]
    Drop,
    /// Abort the clip job on the first undecodable frame.
    FailFast,
}

/// Output configuration for rendered clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Target frame width.
    pub target_width: u32,
    /// Target frame height.
    pub target_height: u32,
    /// Output framerate.
    pub fps: u32,
    /// Whether to burn karaoke subtitles into the clip.
    pub subtitle: bool,
    /// Maximum words per subtitle line.
    pub max_words: usize,
    /// Frame decode failure policy.
    #[serde(default)]
    pub decode_policy: DecodePolicy,
    /// Encoder settings.
    #[serde(default)]
    pub encoding: EncodingConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            fps: DEFAULT_FPS,
            subtitle: true,
            max_words: DEFAULT_MAX_WORDS,
            decode_policy: DecodePolicy::Drop,
            encoding: EncodingConfig::default(),
        }
    }
}

/// The unit of work for the pipeline controller.
///
/// Created per selected moment and destroyed after upload or permanent
/// failure; nothing persists beyond the job's working directory.
#[derive(Debug, Clone)]
pub struct ClipJob {
    /// Path to the full source video on local disk.
    pub source_video: PathBuf,
    /// Clip start in source-video seconds.
    pub start: f64,
    /// Clip end in source-video seconds.
    pub end: f64,
    /// Zero-based clip index within the run.
    pub index: usize,
    /// Full word-level transcript of the source video.
    pub transcript: Vec<WordSpan>,
    /// Output settings.
    pub output: OutputConfig,
    /// Job creation time.
    pub created_at: DateTime<Utc>,
}

impl ClipJob {
    /// Build a job from a well-formed moment.
    ///
    /// Returns `None` if the moment's boundary is unusable (`end <= start`).
    pub fn from_moment(
        source_video: impl Into<PathBuf>,
        moment: Moment,
        index: usize,
        transcript: &[WordSpan],
        output: OutputConfig,
    ) -> Option<Self> {
        if !moment.is_well_formed() {
            return None;
        }
        Some(Self {
            source_video: source_video.into(),
            start: moment.start,
            end: moment.end,
            index,
            transcript: transcript.to_vec(),
            output,
            created_at: Utc::now(),
        })
    }

    /// Clip duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Directory name for this clip inside the run directory.
    pub fn clip_name(&self) -> String {
        format!("clip_{}", self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_moment_rejects_inverted_bounds() {
        let job = ClipJob::from_moment(
            "/tmp/in.mp4",
            Moment::new(45.0, 10.0),
            0,
            &[],
            OutputConfig::default(),
        );
        assert!(job.is_none());
    }

    #[test]
    fn test_from_moment() {
        let words = vec![WordSpan::new(10.0, 10.4, "hello")];
        let job = ClipJob::from_moment(
            "/tmp/in.mp4",
            Moment::new(10.0, 45.0),
            2,
            &words,
            OutputConfig::default(),
        )
        .unwrap();
        assert_eq!(job.clip_name(), "clip_2");
        assert!((job.duration() - 35.0).abs() < f64::EPSILON);
        assert_eq!(job.transcript.len(), 1);
    }

    #[test]
    fn test_output_config_defaults() {
        let cfg = OutputConfig::default();
        assert_eq!(cfg.target_width, 1080);
        assert_eq!(cfg.target_height, 1920);
        assert_eq!(cfg.fps, 25);
        assert_eq!(cfg.max_words, 5);
        assert_eq!(cfg.decode_policy, DecodePolicy::Drop);
    }
}
