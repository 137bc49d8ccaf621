//! Cache entry and error types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use thiserror::Error;

use crate::tile::TileAddress;

/// A tile payload held by the cache.
///
/// Entries are handed out as `Arc<CacheEntry>`; a consumer that keeps the
/// handle past the current frame keeps the payload alive even after the
/// memory tier evicts it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    address: TileAddress,
    payload: Bytes,
    loaded_at: SystemTime,
    source_last_modified: Option<SystemTime>,
}

impl CacheEntry {
    pub fn new(
        address: TileAddress,
        payload: Bytes,
        source_last_modified: Option<SystemTime>,
    ) -> Self {
        Self {
            address,
            payload,
            loaded_at: SystemTime::now(),
            source_last_modified,
        }
    }

    pub fn address(&self) -> &TileAddress {
        &self.address
    }

    /// Encoded tile bytes as stored on disk.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn size_bytes(&self) -> usize {
        self.payload.len()
    }

    /// When this entry entered the memory tier.
    pub fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }

    /// Last-Modified reported by the origin, or the disk file's mtime.
    pub fn source_last_modified(&self) -> Option<SystemTime> {
        self.source_last_modified
    }
}

/// Errors raised by disk cache operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A blocking disk task panicked or was cancelled.
    #[error("disk task failed: {0}")]
    Task(String),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}
