//! Face tracks and talking scores from the speaker-detection collaborator.
//!
//! A track is a temporally contiguous detection of one face. The detector
//! writes two index-aligned artifacts per clip: the track geometry
//! (`tracks.json`) and the per-frame talking scores (`scores.json`). Both are
//! read-only once produced.

use serde::{Deserialize, Serialize};

/// Per-observation geometry arrays for one track.
///
/// All three arrays have one entry per observation, index-aligned with
/// [`FaceTrack::frames`] and with the track's score array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcTrack {
    /// Normalized face size per observation.
    pub s: Vec<f64>,
    /// Face center x in source-frame coordinates.
    pub x: Vec<f64>,
    /// Face center y in source-frame coordinates.
    pub y: Vec<f64>,
}

/// One face track as emitted by the detection collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceTrack {
    /// Source frame index of each observation.
    #[serde(rename = "frame")]
    pub frames: Vec<u32>,
    /// Geometry arrays, index-aligned with `frames`.
    pub proc_track: ProcTrack,
}

impl FaceTrack {
    /// Number of observations in this track.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// A track is consistent when every geometry array matches the frame
    /// index array in length.
    pub fn is_consistent(&self) -> bool {
        let n = self.frames.len();
        self.proc_track.s.len() == n
            && self.proc_track.x.len() == n
            && self.proc_track.y.len() == n
    }
}

/// One face observation attributed to a single output frame, carrying its
/// window-smoothed talking score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceObservation {
    /// Index of the owning track.
    pub track_id: usize,
    /// Smoothed talking score at this frame.
    pub score: f64,
    /// Normalized face size.
    pub scale: f64,
    /// Face center x in source-frame coordinates.
    pub x: f64,
    /// Face center y in source-frame coordinates.
    pub y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_consistency() {
        let track = FaceTrack {
            frames: vec![0, 1, 2],
            proc_track: ProcTrack {
                s: vec![0.1, 0.1, 0.1],
                x: vec![100.0, 101.0, 102.0],
                y: vec![50.0, 50.0, 50.0],
            },
        };
        assert!(track.is_consistent());
        assert_eq!(track.len(), 3);

        let ragged = FaceTrack {
            frames: vec![0, 1],
            proc_track: ProcTrack {
                s: vec![0.1],
                x: vec![100.0],
                y: vec![50.0],
            },
        };
        assert!(!ragged.is_consistent());
    }

    #[test]
    fn test_deserialize_detector_artifact() {
        let json = r#"{
            "frame": [5, 6, 7],
            "proc_track": {"s": [0.2, 0.2, 0.2], "x": [640.0, 642.0, 644.0], "y": [360.0, 360.0, 361.0]}
        }"#;
        let track: FaceTrack = serde_json::from_str(json).unwrap();
        assert!(track.is_consistent());
        assert_eq!(track.frames, vec![5, 6, 7]);
    }
}
