//! Clip-level FFmpeg operations.
//!
//! Each function maps to one media-tool invocation of the pipeline:
//! cutting the clip segment, extracting audio, muxing the rendered video
//! with the clip audio, and burning the compiled subtitle track.

use std::path::Path;

use tracing::info;

use podclip_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Cut a `[start, start+duration]` segment out of the source video.
pub async fn cut_segment(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_secs: f64,
    duration: f64,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    info!(
        "Cutting segment: {} -> {} (start: {:.2}s, duration: {:.2}s)",
        input.display(),
        output.display(),
        start_secs,
        duration
    );

    let cmd = FfmpegCommand::new(input, output)
        .seek(start_secs)
        .duration(duration)
        .output_args(encoding.to_ffmpeg_args());

    FfmpegRunner::new().run(&cmd).await
}

/// Extract the audio track as mono 16 kHz PCM.
///
/// This is the format the word-alignment and speaker-detection collaborators
/// both expect.
pub async fn extract_audio(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    info!(
        "Extracting audio: {} -> {}",
        input.display(),
        output.display()
    );

    let cmd = FfmpegCommand::new(input, output)
        .no_video()
        .output_args(["-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"]);

    FfmpegRunner::new().run(&cmd).await
}

/// Mux a silent video stream with the clip audio into the final container.
///
/// This is the last rendering step; failure here is fatal for the clip since
/// a partial output is never valid.
pub async fn mux_audio_video(
    video: impl AsRef<Path>,
    audio: impl AsRef<Path>,
    output: impl AsRef<Path>,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let video = video.as_ref();
    let audio = audio.as_ref();
    let output = output.as_ref();

    info!(
        "Muxing: {} + {} -> {}",
        video.display(),
        audio.display(),
        output.display()
    );

    let cmd = FfmpegCommand::new(video, output)
        .extra_input(audio)
        .output_args(encoding.to_ffmpeg_args());

    FfmpegRunner::new().run(&cmd).await
}

/// Burn a compiled ASS subtitle track into a rendered clip.
pub async fn burn_subtitles(
    input: impl AsRef<Path>,
    subtitles: impl AsRef<Path>,
    output: impl AsRef<Path>,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let input = input.as_ref();
    let subtitles = subtitles.as_ref();
    let output = output.as_ref();

    info!(
        "Burning subtitles: {} ({}) -> {}",
        input.display(),
        subtitles.display(),
        output.display()
    );

    let cmd = FfmpegCommand::new(input, output)
        .video_filter(format!("ass={}", subtitles.display()))
        .output_args(encoding.to_ffmpeg_args());

    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_extraction_args() {
        let cmd = FfmpegCommand::new("clip.mp4", "audio.wav")
            .no_video()
            .output_args(["-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"]);
        let args = cmd.build_args();
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"pcm_s16le".to_string()));
        assert!(args.contains(&"16000".to_string()));
        assert!(args.contains(&"1".to_string()));
    }

    #[test]
    fn test_burn_filter_references_track() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .video_filter("ass=/tmp/subs.ass");
        let args = cmd.build_args();
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "ass=/tmp/subs.ass");
    }
}
