//! Speaker-detection collaborator boundary.
//!
//! Active speaker detection runs as an external process. The pipeline only
//! consumes its two output artifacts: per-track geometry
//! (`pywork/tracks.json`) and per-track talking scores (`pywork/scores.json`),
//! index-aligned with each other. Extracted frames land in `pyframes/`.
//!
//! The boundary is a trait so the controller never assumes in-process
//! execution; the production implementation shells out to the TalkNet
//! scoring script.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use podclip_models::FaceTrack;

use crate::error::{MediaError, MediaResult};

/// Subdirectory holding the detector's binary artifacts.
pub const WORK_SUBDIR: &str = "pywork";
/// Subdirectory holding extracted frames.
pub const FRAMES_SUBDIR: &str = "pyframes";
/// Subdirectory for intermediate audio/video files.
pub const AVI_SUBDIR: &str = "pyavi";

/// The two artifacts the detector must produce for a clip.
#[derive(Debug, Clone, Default)]
pub struct DetectionArtifacts {
    /// One entry per face track.
    pub tracks: Vec<FaceTrack>,
    /// Per-track talking scores, index-aligned with `tracks`.
    pub scores: Vec<Vec<f64>>,
}

impl DetectionArtifacts {
    /// Artifacts are aligned when there is one score array per track.
    pub fn is_aligned(&self) -> bool {
        self.tracks.len() == self.scores.len()
    }
}

/// Boundary for the active-speaker-detection collaborator.
#[async_trait]
pub trait SpeakerDetection: Send + Sync {
    /// Run detection for `clip_name` inside `base_dir` and load the
    /// resulting artifacts.
    ///
    /// The clip video must exist at `{base_dir}/{clip_name}.mp4` before the
    /// call; afterwards `{base_dir}/{clip_name}/pyframes/` holds the decoded
    /// frame sequence.
    async fn detect(&self, base_dir: &Path, clip_name: &str) -> MediaResult<DetectionArtifacts>;
}

/// Production detector: shells out to the TalkNet/Columbia scoring script.
#[derive(Debug, Clone)]
pub struct TalkNetDetector {
    /// Directory containing the detection script and model weights.
    script_dir: PathBuf,
    /// Script file name.
    script: String,
    /// Pretrained model path, relative to `script_dir`.
    weights: String,
    /// Python interpreter.
    python: String,
}

impl TalkNetDetector {
    pub fn new(script_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_dir: script_dir.into(),
            script: "Columbia_test.py".to_string(),
            weights: "weight/finetuning_TalkSet.model".to_string(),
            python: "python3".to_string(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        let script_dir = std::env::var("ASD_SCRIPT_DIR").unwrap_or_else(|_| "/asd".to_string());
        let mut detector = Self::new(script_dir);
        if let Ok(script) = std::env::var("ASD_SCRIPT") {
            detector.script = script;
        }
        if let Ok(weights) = std::env::var("ASD_WEIGHTS") {
            detector.weights = weights;
        }
        detector
    }
}

#[async_trait]
impl SpeakerDetection for TalkNetDetector {
    async fn detect(&self, base_dir: &Path, clip_name: &str) -> MediaResult<DetectionArtifacts> {
        info!(
            clip = clip_name,
            dir = %base_dir.display(),
            "Running speaker detection"
        );

        let output = Command::new(&self.python)
            .arg(&self.script)
            .arg("--videoName")
            .arg(clip_name)
            .arg("--videoFolder")
            .arg(base_dir)
            .arg("--pretrainModel")
            .arg(&self.weights)
            .current_dir(&self.script_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                MediaError::detection_failed(format!("failed to spawn detector: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                clip = clip_name,
                status = ?output.status.code(),
                "Speaker detection script failed"
            );
            return Err(MediaError::detection_failed(format!(
                "detector exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let work_dir = base_dir.join(clip_name).join(WORK_SUBDIR);
        load_artifacts(&work_dir).await
    }
}

/// Load and validate the detector's artifacts from its work directory.
///
/// Missing or unreadable artifacts after a detection run are a contract
/// violation and fatal for the clip job.
pub async fn load_artifacts(work_dir: &Path) -> MediaResult<DetectionArtifacts> {
    let tracks_path = work_dir.join("tracks.json");
    let scores_path = work_dir.join("scores.json");

    let tracks_bytes = tokio::fs::read(&tracks_path)
        .await
        .map_err(|_| MediaError::ArtifactMissing(tracks_path.clone()))?;
    let scores_bytes = tokio::fs::read(&scores_path)
        .await
        .map_err(|_| MediaError::ArtifactMissing(scores_path.clone()))?;

    let tracks: Vec<FaceTrack> = serde_json::from_slice(&tracks_bytes)?;
    let scores: Vec<Vec<f64>> = serde_json::from_slice(&scores_bytes)?;

    let artifacts = DetectionArtifacts { tracks, scores };
    if !artifacts.is_aligned() {
        return Err(MediaError::detection_failed(format!(
            "artifact mismatch: {} tracks but {} score arrays",
            artifacts.tracks.len(),
            artifacts.scores.len()
        )));
    }

    info!(
        tracks = artifacts.tracks.len(),
        "Loaded detection artifacts"
    );
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_artifacts(dir: &Path, tracks: &str, scores: &str) {
        tokio::fs::create_dir_all(dir).await.unwrap();
        tokio::fs::write(dir.join("tracks.json"), tracks).await.unwrap();
        tokio::fs::write(dir.join("scores.json"), scores).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(
            dir.path(),
            r#"[{"frame":[0,1],"proc_track":{"s":[0.1,0.1],"x":[10.0,11.0],"y":[5.0,5.0]}}]"#,
            r#"[[0.5,0.7]]"#,
        )
        .await;

        let artifacts = load_artifacts(dir.path()).await.unwrap();
        assert_eq!(artifacts.tracks.len(), 1);
        assert_eq!(artifacts.scores[0], vec![0.5, 0.7]);
        assert!(artifacts.is_aligned());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("tracks.json"), "[]")
            .await
            .unwrap();

        let err = load_artifacts(dir.path()).await.unwrap_err();
        assert!(matches!(err, MediaError::ArtifactMissing(_)));
    }

    #[tokio::test]
    async fn test_misaligned_artifacts_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(
            dir.path(),
            r#"[{"frame":[0],"proc_track":{"s":[0.1],"x":[10.0],"y":[5.0]}}]"#,
            r#"[[0.5],[0.7]]"#,
        )
        .await;

        let err = load_artifacts(dir.path()).await.unwrap_err();
        assert!(matches!(err, MediaError::DetectionFailed(_)));
    }
}
