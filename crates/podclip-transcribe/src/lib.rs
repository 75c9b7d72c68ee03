//! Client for the external transcription/word-alignment service.
//!
//! The service performs ASR and word-level alignment; this crate only
//! consumes its output as an ordered sequence of `{start, end, word}`
//! records. Entries with missing timestamps or empty text are discarded at
//! this boundary so downstream code never sees them.

pub mod client;
pub mod error;
pub mod types;

pub use client::{TranscribeClient, TranscribeConfig};
pub use error::{TranscribeError, TranscribeResult};
pub use types::{AlignedWord, TranscribeRequest, TranscribeResponse};
