//! Per-video pipeline controller.
//!
//! Sequences one video through download, transcription, moment selection
//! and the per-clip state machine:
//! cut -> extract audio -> detect speakers -> reframe -> [subtitle] -> mux
//! -> upload. A clip-stage failure aborts that clip only; sibling clips are
//! unaffected. The run directory is removed unconditionally when the run
//! ends, whichever stage failed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use podclip_media::detection::{AVI_SUBDIR, FRAMES_SUBDIR, WORK_SUBDIR};
use podclip_media::{
    burn_subtitles, compile_subtitles, cut_segment, extract_audio, render_vertical,
    SpeakerDetection,
};
use podclip_models::{ClipJob, Moment, OutputConfig, WordSpan};
use podclip_storage::StorageClient;
use podclip_transcribe::TranscribeClient;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::gemini::{GeminiClient, GenerateText};
use crate::logging::RunLogger;
use crate::moments::MomentSelector;

/// One video-processing request.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Object storage key of the source video.
    pub storage_path: String,
    /// The user's topic prompt for moment selection.
    pub topic_prompt: String,
    /// Maximum number of clips to produce.
    pub clip_count: usize,
    /// Output settings for every clip of this run.
    pub output: OutputConfig,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSummary {
    /// Run identifier.
    pub run_id: String,
    /// Number of moments the model proposed (before truncation).
    pub moments_found: usize,
    /// Storage keys of the uploaded clips, in clip order.
    pub clips: Vec<String>,
    /// Number of clip jobs that failed.
    pub failed_clips: usize,
}

/// Exclusively-owned per-run working directory.
///
/// Removal runs in `Drop` so cleanup is guaranteed on every exit path,
/// including mid-pipeline errors.
struct RunDir {
    path: PathBuf,
}

impl RunDir {
    async fn create(base: &Path, run_id: &str) -> WorkerResult<Self> {
        let path = base.join(run_id);
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove run directory"
            );
        }
    }
}

/// Build clip jobs from selected moments.
///
/// The moment list is truncated to `clip_count` first; malformed moments
/// inside the window are skipped but keep their index, so clip names stay
/// stable relative to the model's ordering.
pub fn jobs_from_moments(
    source_video: &Path,
    moments: &[Moment],
    clip_count: usize,
    transcript: &[WordSpan],
    output: &OutputConfig,
) -> Vec<ClipJob> {
    moments
        .iter()
        .take(clip_count)
        .enumerate()
        .filter_map(|(index, moment)| {
            ClipJob::from_moment(source_video, *moment, index, transcript, output.clone())
        })
        .collect()
}

/// The per-video pipeline, wired to its collaborators.
///
/// Constructed once at process start and passed by reference into each
/// invocation; it holds no per-run state.
pub struct VideoProcessor<C = GeminiClient> {
    storage: Arc<StorageClient>,
    transcriber: Arc<TranscribeClient>,
    selector: MomentSelector<C>,
    detector: Arc<dyn SpeakerDetection>,
    config: WorkerConfig,
}

impl VideoProcessor<GeminiClient> {
    /// Wire every collaborator from environment variables.
    pub async fn from_env() -> WorkerResult<Self> {
        let config = WorkerConfig::from_env();
        let storage = Arc::new(StorageClient::from_env().await?);
        let transcriber = Arc::new(TranscribeClient::from_env()?);
        let selector = MomentSelector::new(GeminiClient::new()?)
            .with_tiers(config.model_tiers.clone())
            .with_max_retries(config.max_retries_per_model)
            .with_retry_delay(config.retry_delay);
        let detector = Arc::new(podclip_media::TalkNetDetector::from_env());
        Ok(Self::new(storage, transcriber, selector, detector, config))
    }
}

impl<C: GenerateText> VideoProcessor<C> {
    pub fn new(
        storage: Arc<StorageClient>,
        transcriber: Arc<TranscribeClient>,
        selector: MomentSelector<C>,
        detector: Arc<dyn SpeakerDetection>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            storage,
            transcriber,
            selector,
            detector,
            config,
        }
    }

    /// Process one video end to end.
    pub async fn process_video(&self, request: ProcessRequest) -> WorkerResult<ProcessSummary> {
        let run_id = Uuid::new_v4().to_string();
        let logger = RunLogger::new(&run_id, "video_processing");
        let run_dir = RunDir::create(Path::new(&self.config.work_dir), &run_id).await?;

        logger.log_start(&format!("source {}", request.storage_path));

        let video_path = run_dir.path().join("input_video.mp4");
        self.storage
            .download_file(&request.storage_path, &video_path)
            .await?;

        let audio_path = run_dir.path().join("audio.wav");
        extract_audio(&video_path, &audio_path).await?;

        let transcript = self.transcriber.align(&audio_path).await?;
        logger.log_progress(&format!("transcribed {} words", transcript.len()));

        let moments = self
            .selector
            .select_moments(&transcript, &request.topic_prompt)
            .await?;
        logger.log_progress(&format!("model proposed {} moments", moments.len()));

        let clip_count = request.clip_count.min(self.config.max_clips);
        let jobs = jobs_from_moments(
            &video_path,
            &moments,
            clip_count,
            &transcript,
            &request.output,
        );

        let mut clips = Vec::new();
        let mut failed_clips = 0;
        for job in &jobs {
            match self
                .process_clip(run_dir.path(), job, &request.storage_path)
                .await
            {
                Ok(key) => clips.push(key),
                Err(e) => {
                    failed_clips += 1;
                    logger.log_error(&format!("{} failed: {}", job.clip_name(), e));
                }
            }
        }

        logger.log_completion(&format!(
            "{} uploaded, {} failed",
            clips.len(),
            failed_clips
        ));

        Ok(ProcessSummary {
            run_id,
            moments_found: moments.len(),
            clips,
            failed_clips,
        })
        // run_dir drops here and removes the working tree
    }

    /// Run one clip job through the stage machine and upload the result.
    async fn process_clip(
        &self,
        base_dir: &Path,
        job: &ClipJob,
        source_key: &str,
    ) -> WorkerResult<String> {
        let clip_name = job.clip_name();
        let logger = RunLogger::new(&clip_name, "clip_render");
        logger.log_start(&format!("{:.2}s - {:.2}s", job.start, job.end));

        let clip_dir = base_dir.join(&clip_name);
        for subdir in [AVI_SUBDIR, FRAMES_SUBDIR, WORK_SUBDIR] {
            tokio::fs::create_dir_all(clip_dir.join(subdir)).await?;
        }

        // cut
        let segment_path = clip_dir.join(format!("{}_segment.mp4", clip_name));
        cut_segment(
            &job.source_video,
            &segment_path,
            job.start,
            job.duration(),
            &job.output.encoding,
        )
        .await?;

        // extract_audio
        let audio_path = clip_dir.join(AVI_SUBDIR).join("audio.wav");
        extract_audio(&segment_path, &audio_path).await?;

        // The detector expects the clip video next to its output directory.
        tokio::fs::copy(&segment_path, base_dir.join(format!("{}.mp4", clip_name))).await?;

        // detect_speakers (external) + load tracks/scores
        let artifacts = self.detector.detect(base_dir, &clip_name).await?;
        logger.log_progress(&format!("{} face tracks", artifacts.tracks.len()));

        // reframe + mux
        let frames_dir = clip_dir.join(FRAMES_SUBDIR);
        let vertical_path = clip_dir.join(AVI_SUBDIR).join("video_out_vertical.mp4");
        render_vertical(
            &artifacts,
            &frames_dir,
            &audio_path,
            &vertical_path,
            &job.output,
        )
        .await?;

        // subtitle (optional)
        let final_path = if job.output.subtitle {
            let doc = compile_subtitles(
                &job.transcript,
                job.start,
                job.end,
                job.output.max_words,
                (job.output.target_width, job.output.target_height),
            );
            let ass_path = clip_dir.join(AVI_SUBDIR).join("subtitles.ass");
            doc.write_to(&ass_path).await?;

            let subtitled_path = clip_dir.join(AVI_SUBDIR).join("video_with_subtitles.mp4");
            burn_subtitles(
                &vertical_path,
                &ass_path,
                &subtitled_path,
                &job.output.encoding,
            )
            .await?;
            subtitled_path
        } else {
            vertical_path
        };

        // upload only after the full render succeeded
        let key = self
            .storage
            .upload_clip(&final_path, source_key, job.index)
            .await?;

        logger.log_completion(&key);
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> OutputConfig {
        OutputConfig::default()
    }

    #[test]
    fn test_single_moment_single_job() {
        let moments = vec![Moment::new(10.0, 45.0)];
        let jobs = jobs_from_moments(Path::new("/tmp/v.mp4"), &moments, 1, &[], &output());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].start, 10.0);
        assert_eq!(jobs[0].end, 45.0);
        assert_eq!(jobs[0].index, 0);
    }

    #[test]
    fn test_zero_clip_count_yields_no_jobs() {
        let moments = vec![Moment::new(10.0, 45.0), Moment::new(60.0, 100.0)];
        let jobs = jobs_from_moments(Path::new("/tmp/v.mp4"), &moments, 0, &[], &output());
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_truncation_to_clip_count() {
        let moments: Vec<Moment> = (0..10)
            .map(|i| Moment::new(i as f64 * 100.0, i as f64 * 100.0 + 40.0))
            .collect();
        let jobs = jobs_from_moments(Path::new("/tmp/v.mp4"), &moments, 3, &[], &output());
        assert_eq!(jobs.len(), 3);
        // Ordering preserved as returned by the model
        assert_eq!(jobs[0].start, 0.0);
        assert_eq!(jobs[2].start, 200.0);
    }

    #[test]
    fn test_malformed_moment_skipped_but_keeps_index() {
        let moments = vec![Moment::new(40.0, 10.0), Moment::new(60.0, 100.0)];
        let jobs = jobs_from_moments(Path::new("/tmp/v.mp4"), &moments, 5, &[], &output());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].index, 1);
        assert_eq!(jobs[0].clip_name(), "clip_1");
    }

    #[tokio::test]
    async fn test_run_dir_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let path = {
            let run_dir = RunDir::create(base.path(), "run-x").await.unwrap();
            tokio::fs::write(run_dir.path().join("scratch.txt"), b"data")
                .await
                .unwrap();
            run_dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
