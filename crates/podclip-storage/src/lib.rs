//! S3-compatible object storage client for clip sources and outputs.

pub mod client;
pub mod error;
pub mod operations;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use operations::clip_key;
