//! Transcription service request/response types.

use serde::{Deserialize, Serialize};

/// Request for word-level alignment of an audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeRequest {
    /// Path to the extracted audio (mono 16 kHz PCM).
    pub audio_path: String,
    /// Optional language hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One aligned word as returned by the service.
///
/// Timestamps are optional on the wire; entries without them are discarded
/// at the client boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedWord {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub word: String,
}

/// Alignment response: words in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub words: Vec<AlignedWord>,
}
