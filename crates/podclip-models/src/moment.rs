//! LLM-proposed clip moments.

use serde::{Deserialize, Serialize};

/// Minimum clip duration requested from the model (seconds).
pub const MIN_CLIP_SECS: f64 = 30.0;
/// Maximum clip duration requested from the model (seconds).
pub const MAX_CLIP_SECS: f64 = 60.0;

/// A candidate clip boundary proposed by the moment-selection model.
///
/// `end > start` must hold for a moment to become a job. The `[30, 60]`
/// second duration policy is enforced through the prompt, not here; a
/// violating moment is still representable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    /// Clip start in seconds, aligned to a transcript word boundary.
    pub start: f64,
    /// Clip end in seconds.
    pub end: f64,
}

impl Moment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the boundary is usable as a clip job (`end > start`).
    pub fn is_well_formed(&self) -> bool {
        self.end > self.start
    }

    /// Whether the duration falls inside the advisory policy window.
    pub fn within_policy(&self) -> bool {
        let d = self.duration();
        (MIN_CLIP_SECS..=MAX_CLIP_SECS).contains(&d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed() {
        assert!(Moment::new(10.0, 45.0).is_well_formed());
        assert!(!Moment::new(45.0, 10.0).is_well_formed());
        assert!(!Moment::new(10.0, 10.0).is_well_formed());
    }

    #[test]
    fn test_policy_is_advisory() {
        // A 5-second moment is outside policy but still representable
        let m = Moment::new(0.0, 5.0);
        assert!(m.is_well_formed());
        assert!(!m.within_policy());
        assert!(Moment::new(0.0, 45.0).within_policy());
    }

    #[test]
    fn test_parse_from_model_output() {
        let parsed: Vec<Moment> =
            serde_json::from_str(r#"[{"start": 10, "end": 45}]"#).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!((parsed[0].duration() - 35.0).abs() < f64::EPSILON);
    }
}
