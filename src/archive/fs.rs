//! Filesystem-backed archive store

use super::{ArchiveReceipt, ArchiveStore};
use crate::error::ArchiveError;
use crate::types::ArchiveKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Archive store writing objects below a root directory
///
/// `/` inside a key becomes a subdirectory, as object names do in a bucket
/// listing. Each object is written to a temporary file next to its final
/// path and renamed into place only once fully written; the temporary file
/// is removed on every other exit path.
#[derive(Debug, Clone)]
pub struct FsArchiveStore {
    root: PathBuf,
}

impl FsArchiveStore {
    /// Create a store rooted at `root` (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path an object with this key is stored at
    pub fn object_path(&self, key: &ArchiveKey) -> Result<PathBuf, ArchiveError> {
        let relative = Path::new(key.as_str());
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.as_str().is_empty() || escapes {
            return Err(ArchiveError::Write {
                key: key.to_string(),
                reason: "key does not name a path inside the archive root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

fn write_object(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::other("object path has no parent directory"))?;
    std::fs::create_dir_all(dir)?;

    // Dropped (and deleted) on any early return below.
    let mut partial = tempfile::Builder::new()
        .prefix(".partial-")
        .tempfile_in(dir)?;
    partial.write_all(content)?;
    partial.as_file().sync_all()?;
    partial.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl ArchiveStore for FsArchiveStore {
    async fn store(&self, key: &ArchiveKey, content: Bytes) -> Result<ArchiveReceipt, ArchiveError> {
        let path = self.object_path(key)?;
        let bytes = content.len() as u64;

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_object(&target, &content))
            .await
            .map_err(|e| ArchiveError::Finalize {
                key: key.to_string(),
                reason: e.to_string(),
            })?
            .map_err(|e| ArchiveError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %path.display(), bytes, "object written");

        Ok(ArchiveReceipt {
            location: path.display().to_string(),
            bytes,
        })
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
