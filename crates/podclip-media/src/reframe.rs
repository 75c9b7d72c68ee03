//! Vertical reframing engine.
//!
//! Converts face-track geometry and talking scores into a per-frame
//! crop-or-letterbox decision and composites a vertical frame sequence:
//!
//! 1. Attribute every face observation to its source frame, smoothing the
//!    raw talking score over a centered 30-frame half-window so the mode
//!    decision does not flicker.
//! 2. Pick the observation with the highest smoothed score per frame; a
//!    negative maximum means nobody is talking and the candidate is dropped.
//! 3. Frames with a dominant face are cropped around it; all other frames
//!    are letterboxed over a blurred full-frame background.
//!
//! Planning is pure code; only the composition loop touches the filesystem
//! and the FFmpeg encoder pipe.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::{debug, info, warn};

use podclip_models::{DecodePolicy, FaceObservation, FaceTrack, OutputConfig};

use crate::command::RawVideoSink;
use crate::detection::DetectionArtifacts;
use crate::error::{MediaError, MediaResult};
use crate::ops::mux_audio_video;

/// Half-window (in observations) for talking-score smoothing.
const SCORE_HALF_WINDOW: usize = 30;

/// Gaussian sigma for the letterbox background blur. Matches the heavy
/// 121x121 kernel of the reference pipeline (kernel ~ 6*sigma + 1).
const BACKGROUND_BLUR_SIGMA: f32 = 20.0;

/// Per-frame reframing decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameMode {
    /// Crop a `target_w`-wide window centered on the dominant face.
    Crop {
        /// Face center x in source-frame coordinates.
        center_x: f64,
    },
    /// Letterbox the full frame over a blurred background.
    Resize,
}

/// Mean of the raw scores in the centered window around `fidx`.
///
/// The window is clipped to the track bounds; an empty slice yields 0.
pub fn smoothed_score(scores: &[f64], fidx: usize) -> f64 {
    let start = fidx.saturating_sub(SCORE_HALF_WINDOW);
    let end = (fidx + SCORE_HALF_WINDOW).min(scores.len());
    if start >= end {
        return 0.0;
    }
    let window = &scores[start..end];
    window.iter().sum::<f64>() / window.len() as f64
}

/// Attribute every observation across all tracks to its source frame.
///
/// Observations pointing past `frame_count` are skipped (the detector and
/// the frame extractor disagree about the clip length); observations without
/// matching geometry are skipped as well.
pub fn collect_faces(
    tracks: &[FaceTrack],
    scores: &[Vec<f64>],
    frame_count: usize,
) -> Vec<Vec<FaceObservation>> {
    let mut faces: Vec<Vec<FaceObservation>> = vec![Vec::new(); frame_count];

    for (tidx, track) in tracks.iter().enumerate() {
        let Some(score_array) = scores.get(tidx) else {
            continue;
        };
        for (fidx, &frame) in track.frames.iter().enumerate() {
            let frame = frame as usize;
            if frame >= frame_count {
                warn!(
                    track = tidx,
                    frame, frame_count, "Observation beyond frame list, skipping"
                );
                continue;
            }
            let (Some(&s), Some(&x), Some(&y)) = (
                track.proc_track.s.get(fidx),
                track.proc_track.x.get(fidx),
                track.proc_track.y.get(fidx),
            ) else {
                warn!(track = tidx, fidx, "Ragged track geometry, skipping observation");
                continue;
            };

            faces[frame].push(FaceObservation {
                track_id: tidx,
                score: smoothed_score(score_array, fidx),
                scale: s,
                x,
                y,
            });
        }
    }

    faces
}

/// Select the dominant speaker candidate for one frame.
///
/// Returns the observation with the maximum smoothed score, unless that
/// maximum is negative (the detector's "not talking" convention).
pub fn dominant_face(faces: &[FaceObservation]) -> Option<&FaceObservation> {
    let best = faces
        .iter()
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))?;
    if best.score < 0.0 {
        None
    } else {
        Some(best)
    }
}

/// Decide the reframing mode for one frame.
pub fn decide_mode(faces: &[FaceObservation]) -> FrameMode {
    match dominant_face(faces) {
        Some(face) => FrameMode::Crop { center_x: face.x },
        None => FrameMode::Resize,
    }
}

/// Horizontal crop window for crop mode.
///
/// The source is scaled so its height equals `target_h`; the returned window
/// left edge is clamped into `[0, scaled_w - target_w]` for any face x.
/// Returns `None` when the scaled frame is narrower than the target (the
/// crop would be invalid; the caller falls back to resize mode).
pub fn crop_window(
    center_x_src: f64,
    src_w: u32,
    src_h: u32,
    target_w: u32,
    target_h: u32,
) -> Option<(u32, u32)> {
    if src_w == 0 || src_h == 0 {
        return None;
    }
    let scale = target_h as f64 / src_h as f64;
    let scaled_w = (src_w as f64 * scale).round() as u32;
    if scaled_w < target_w {
        return None;
    }
    let center_x = center_x_src * scale;
    let max_left = (scaled_w - target_w) as f64;
    let left = (center_x - target_w as f64 / 2.0).clamp(0.0, max_left) as u32;
    Some((left, scaled_w))
}

/// Compose a crop-mode frame.
fn compose_crop(img: &RgbImage, center_x_src: f64, target_w: u32, target_h: u32) -> Option<RgbImage> {
    let (left, scaled_w) = crop_window(center_x_src, img.width(), img.height(), target_w, target_h)?;
    let scaled = imageops::resize(img, scaled_w, target_h, FilterType::Triangle);
    Some(imageops::crop_imm(&scaled, left, 0, target_w, target_h).to_image())
}

/// Compose a resize-mode (letterbox-with-blur) frame.
///
/// The foreground is fit by width and centered vertically over the source
/// scaled to cover the full target box, heavily blurred and center-cropped.
fn compose_resize(img: &RgbImage, target_w: u32, target_h: u32) -> RgbImage {
    let (src_w, src_h) = img.dimensions();

    // Background: scale to cover, blur, center-crop to the target box.
    let cover = f64::max(
        target_w as f64 / src_w as f64,
        target_h as f64 / src_h as f64,
    );
    let bg_w = ((src_w as f64 * cover).ceil() as u32).max(target_w);
    let bg_h = ((src_h as f64 * cover).ceil() as u32).max(target_h);
    let background = imageops::resize(img, bg_w, bg_h, FilterType::Triangle);
    let background = imageops::blur(&background, BACKGROUND_BLUR_SIGMA);
    let crop_x = (bg_w - target_w) / 2;
    let crop_y = (bg_h - target_h) / 2;
    let mut frame = imageops::crop_imm(&background, crop_x, crop_y, target_w, target_h).to_image();

    // Foreground: fit by width, centered vertically.
    let fg_h = ((src_h as f64 * target_w as f64 / src_w as f64).round() as u32).max(1);
    let foreground = imageops::resize(img, target_w, fg_h, FilterType::Triangle);
    let offset_y = (target_h.saturating_sub(fg_h)) / 2;
    imageops::overlay(&mut frame, &foreground, 0, offset_y as i64);

    frame
}

/// Sorted list of extracted frame images in `frames_dir`.
async fn list_frames(frames_dir: &Path) -> MediaResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(frames_dir).await?;
    let mut frames = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("jpg") {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Render the vertical clip: compose every frame, then mux with the clip
/// audio.
///
/// A missing or empty track list degrades every frame to resize mode. Frame
/// decode failures follow the configured [`DecodePolicy`]. The final mux is
/// fatal on failure; no partial output is considered valid.
pub async fn render_vertical(
    artifacts: &DetectionArtifacts,
    frames_dir: &Path,
    audio: &Path,
    output: &Path,
    config: &OutputConfig,
) -> MediaResult<()> {
    let frames = list_frames(frames_dir).await?;
    if frames.is_empty() {
        return Err(MediaError::InvalidVideo(format!(
            "no frames found in {}",
            frames_dir.display()
        )));
    }

    let faces = collect_faces(&artifacts.tracks, &artifacts.scores, frames.len());

    let video_only = output
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("video_only.mp4");

    let mut sink = RawVideoSink::open(
        &video_only,
        config.target_width,
        config.target_height,
        config.fps,
        &config.encoding.to_video_args(),
    )?;

    let mut dropped = 0usize;
    for (fidx, frame_path) in frames.iter().enumerate() {
        let img = match image::open(frame_path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => match config.decode_policy {
                DecodePolicy::Drop => {
                    warn!(frame = fidx, error = %e, "Frame decode failed, dropping");
                    dropped += 1;
                    continue;
                }
                DecodePolicy::FailFast => {
                    return Err(MediaError::FrameDecode(frame_path.clone()));
                }
            },
        };

        let composed = match decide_mode(&faces[fidx]) {
            FrameMode::Crop { center_x } => {
                compose_crop(&img, center_x, config.target_width, config.target_height)
                    .unwrap_or_else(|| {
                        // Scaled frame narrower than the target: crop is
                        // impossible, letterbox instead.
                        compose_resize(&img, config.target_width, config.target_height)
                    })
            }
            FrameMode::Resize => compose_resize(&img, config.target_width, config.target_height),
        };

        sink.write_frame(composed.as_raw()).await?;
    }

    let written = sink.frames_written();
    sink.finish().await?;

    if dropped > 0 {
        warn!(dropped, written, "Rendered with dropped frames");
    }
    debug!(frames = written, "Vertical stream encoded");

    mux_audio_video(&video_only, audio, output, &config.encoding).await?;

    info!(
        output = %output.display(),
        frames = written,
        "Vertical clip rendered"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use podclip_models::ProcTrack;

    fn track(frames: Vec<u32>, x: Vec<f64>) -> FaceTrack {
        let n = frames.len();
        FaceTrack {
            frames,
            proc_track: ProcTrack {
                s: vec![0.1; n],
                x,
                y: vec![0.0; n],
            },
        }
    }

    #[test]
    fn test_smoothed_score_window() {
        let scores = vec![1.0, 2.0, 3.0];
        // Window around index 1 covers the whole array
        assert!((smoothed_score(&scores, 1) - 2.0).abs() < 1e-9);
        // Empty input
        assert_eq!(smoothed_score(&[], 0), 0.0);
    }

    #[test]
    fn test_smoothed_score_clips_to_bounds() {
        // 100 samples: first half 0.0, second half 1.0
        let mut scores = vec![0.0; 50];
        scores.extend(vec![1.0; 50]);
        // At index 0 the window is [0, 30): all zeros
        assert_eq!(smoothed_score(&scores, 0), 0.0);
        // At the last index the window is [69, 100): all ones
        assert_eq!(smoothed_score(&scores, 99), 1.0);
        // In the middle the mean is between the two
        let mid = smoothed_score(&scores, 50);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_no_observations_selects_resize() {
        assert_eq!(decide_mode(&[]), FrameMode::Resize);
    }

    #[test]
    fn test_negative_best_score_selects_resize() {
        let faces = vec![
            FaceObservation {
                track_id: 0,
                score: -0.5,
                scale: 0.1,
                x: 100.0,
                y: 50.0,
            },
            FaceObservation {
                track_id: 1,
                score: -0.1,
                scale: 0.1,
                x: 300.0,
                y: 50.0,
            },
        ];
        assert_eq!(decide_mode(&faces), FrameMode::Resize);
    }

    #[test]
    fn test_dominant_face_wins() {
        let faces = vec![
            FaceObservation {
                track_id: 0,
                score: 0.2,
                scale: 0.1,
                x: 100.0,
                y: 50.0,
            },
            FaceObservation {
                track_id: 1,
                score: 0.9,
                scale: 0.1,
                x: 300.0,
                y: 50.0,
            },
        ];
        assert_eq!(decide_mode(&faces), FrameMode::Crop { center_x: 300.0 });
    }

    #[test]
    fn test_collect_faces_attribution() {
        let tracks = vec![track(vec![0, 2], vec![100.0, 110.0])];
        let scores = vec![vec![0.5, 0.7]];
        let faces = collect_faces(&tracks, &scores, 3);
        assert_eq!(faces[0].len(), 1);
        assert!(faces[1].is_empty());
        assert_eq!(faces[2].len(), 1);
        assert_eq!(faces[2][0].x, 110.0);
    }

    #[test]
    fn test_collect_faces_skips_out_of_range() {
        let tracks = vec![track(vec![0, 99], vec![100.0, 110.0])];
        let scores = vec![vec![0.5, 0.7]];
        let faces = collect_faces(&tracks, &scores, 2);
        assert_eq!(faces[0].len(), 1);
        assert_eq!(faces.iter().map(|f| f.len()).sum::<usize>(), 1);
    }

    #[test]
    fn test_collect_faces_empty_tracks_means_all_resize() {
        let faces = collect_faces(&[], &[], 5);
        assert_eq!(faces.len(), 5);
        assert!(faces.iter().all(|f| decide_mode(f) == FrameMode::Resize));
    }

    #[test]
    fn test_crop_window_clamps_low() {
        // 1920x1080 source, 1080x1920 target: scaled_w = 3413
        let (left, scaled_w) = crop_window(-5000.0, 1920, 1080, 1080, 1920).unwrap();
        assert_eq!(left, 0);
        assert_eq!(scaled_w, 3413);
    }

    #[test]
    fn test_crop_window_clamps_high() {
        let (left, scaled_w) = crop_window(1e9, 1920, 1080, 1080, 1920).unwrap();
        assert_eq!(left, scaled_w - 1080);
    }

    #[test]
    fn test_crop_window_centered() {
        // Face in the middle of a 1920-wide source
        let (left, scaled_w) = crop_window(960.0, 1920, 1080, 1080, 1920).unwrap();
        let center = left + 540;
        // Scaled center is scaled_w / 2
        assert!((center as i64 - (scaled_w / 2) as i64).abs() <= 1);
    }

    #[test]
    fn test_crop_window_in_bounds_for_any_x() {
        for x in [-100.0, 0.0, 500.0, 960.0, 1919.0, 5000.0] {
            let (left, scaled_w) = crop_window(x, 1920, 1080, 1080, 1920).unwrap();
            assert!(left <= scaled_w - 1080, "x={} left={} scaled_w={}", x, left, scaled_w);
        }
    }

    #[test]
    fn test_crop_window_portrait_source_rejected() {
        // Portrait source scaled by height is narrower than the target
        assert!(crop_window(100.0, 540, 1920, 1080, 1920).is_none());
    }

    #[test]
    fn test_compose_resize_dimensions() {
        let img = RgbImage::from_pixel(64, 36, image::Rgb([200, 100, 50]));
        let frame = compose_resize(&img, 18, 32);
        assert_eq!(frame.dimensions(), (18, 32));
    }

    #[test]
    fn test_compose_crop_dimensions() {
        let img = RgbImage::from_pixel(64, 36, image::Rgb([200, 100, 50]));
        let frame = compose_crop(&img, 32.0, 18, 32).unwrap();
        assert_eq!(frame.dimensions(), (18, 32));
    }
}
