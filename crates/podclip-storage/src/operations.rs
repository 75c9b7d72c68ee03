//! High-level storage operations and key layout.

use std::path::Path;

use crate::client::StorageClient;
use crate::error::{StorageError, StorageResult};

/// Derive the upload key for a rendered clip.
///
/// Layout: `{owning_folder}/clips/{clip_identifier}_clip_{index}.mp4`, where
/// the owning folder is the source key's parent and the clip identifier is
/// the source file stem. Deriving the identifier from the source key keeps
/// clips from different runs of the same folder from colliding.
pub fn clip_key(source_key: &str, index: usize) -> StorageResult<String> {
    let source = Path::new(source_key);
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StorageError::InvalidKey(source_key.to_string()))?;

    let identifier: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    let folder = source
        .parent()
        .and_then(|p| p.to_str())
        .filter(|p| !p.is_empty());

    Ok(match folder {
        Some(folder) => format!("{}/clips/{}_clip_{}.mp4", folder, identifier, index),
        None => format!("clips/{}_clip_{}.mp4", identifier, index),
    })
}

impl StorageClient {
    /// Upload a rendered clip under the source video's folder.
    ///
    /// Returns the object key the clip was stored at.
    pub async fn upload_clip(
        &self,
        path: impl AsRef<Path>,
        source_key: &str,
        index: usize,
    ) -> StorageResult<String> {
        let key = clip_key(source_key, index)?;
        self.upload_file(path, &key, "video/mp4").await?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_key_layout() {
        let key = clip_key("uploads/user1/episode42.mp4", 0).unwrap();
        assert_eq!(key, "uploads/user1/clips/episode42_clip_0.mp4");
    }

    #[test]
    fn test_clip_key_without_folder() {
        let key = clip_key("episode.mp4", 3).unwrap();
        assert_eq!(key, "clips/episode_clip_3.mp4");
    }

    #[test]
    fn test_clip_key_sanitizes_identifier() {
        let key = clip_key("uploads/my show (final).mp4", 1).unwrap();
        assert_eq!(key, "uploads/clips/my_show__final__clip_1.mp4");
    }

    #[test]
    fn test_clip_key_distinct_sources_do_not_collide() {
        let a = clip_key("uploads/a.mp4", 0).unwrap();
        let b = clip_key("uploads/b.mp4", 0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_clip_key_rejects_empty() {
        assert!(clip_key("", 0).is_err());
    }
}
