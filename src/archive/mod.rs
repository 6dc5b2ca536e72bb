//! Archive storage for fetched submissions
//!
//! An [`ArchiveStore`] writes one object per call and overwrites whatever was
//! stored under the same key before. Each call opens its own session with the
//! backend and releases it before returning, whether the write succeeded or
//! not.
//!
//! ## Backends
//!
//! - [`GcsArchiveStore`]: Google Cloud Storage JSON API, authenticated with a
//!   service-account key
//! - [`FsArchiveStore`]: a local directory laid out like a bucket

use crate::config::StorageConfig;
use crate::error::ArchiveError;
use crate::types::ArchiveKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

mod fs;
mod gcs;

pub use fs::FsArchiveStore;
pub use gcs::{GcsArchiveStore, ServiceAccountKey};

/// Where an object ended up
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    /// Backend-specific location (`gs://bucket/key` or a file path)
    pub location: String,
    /// Number of bytes written
    pub bytes: u64,
}

/// Trait for durable submission storage
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Write `content` as a single object under `key`, replacing any previous object
    async fn store(&self, key: &ArchiveKey, content: Bytes) -> Result<ArchiveReceipt, ArchiveError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Pick the store described by the configuration
///
/// A configured `archive_dir` selects the filesystem store; otherwise objects
/// go to Cloud Storage.
pub fn store_from_config(config: &StorageConfig) -> Arc<dyn ArchiveStore> {
    match &config.archive_dir {
        Some(dir) => Arc::new(FsArchiveStore::new(dir.join(&config.bucket))),
        None => Arc::new(GcsArchiveStore::new(
            config.credentials.clone(),
            config.bucket.clone(),
            config.api_base.clone(),
        )),
    }
}
