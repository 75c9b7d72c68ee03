//! Word-level transcript spans.
//!
//! Produced by the external word-alignment service as an ordered sequence;
//! consumers must tolerate entries with missing timestamps by discarding them
//! at the boundary rather than correcting them.

use serde::{Deserialize, Serialize};

/// One aligned word from the transcription collaborator.
///
/// Spans are ordered by `start`; `end >= start` holds for every span that
/// survives boundary filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSpan {
    /// Start time in seconds from the beginning of the source video.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// The word text.
    #[serde(rename = "word")]
    pub text: String,
}

impl WordSpan {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// A span is well-formed when it has non-negative duration and
    /// non-empty text.
    pub fn is_well_formed(&self) -> bool {
        self.end >= self.start && !self.text.trim().is_empty()
    }

    /// Whether this word overlaps the half-open clip window.
    pub fn overlaps(&self, clip_start: f64, clip_end: f64) -> bool {
        self.end > clip_start && self.start < clip_end
    }
}
