//! On-disk tier.
//!
//! All methods here perform blocking filesystem I/O. [`super::CacheStore`]
//! runs them on tokio's blocking pool; tools may call them directly.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tracing::{debug, warn};

use super::path::{absent_marker_path, tile_path};
use super::types::CacheError;
use super::validate::PayloadValidator;
use crate::level::Level;
use crate::tile::TileAddress;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A validated tile file read from disk.
#[derive(Debug, Clone)]
pub struct DiskFile {
    pub path: PathBuf,
    pub payload: Bytes,
    pub modified: Option<SystemTime>,
}

/// Outcome of a disk lookup.
#[derive(Debug, Clone)]
pub enum DiskLookup {
    Hit(DiskFile),
    Missing,
    /// The file predated the level's expiry and was removed.
    Expired,
    /// The file failed validation and was removed.
    Corrupt,
}

impl DiskLookup {
    pub fn into_hit(self) -> Option<DiskFile> {
        match self {
            DiskLookup::Hit(file) => Some(file),
            _ => None,
        }
    }
}

/// File and byte counts of a disk tier subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStats {
    pub files: u64,
    pub bytes: u64,
    pub absent_markers: u64,
}

impl std::fmt::Display for DiskStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tiles, {} bytes, {} absent markers",
            self.files, self.bytes, self.absent_markers
        )
    }
}

/// File store rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct DiskTier {
    root: PathBuf,
}

impl DiskTier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tile_path(&self, address: &TileAddress, level: &Level) -> PathBuf {
        tile_path(&self.root, address, level.format_suffix())
    }

    /// Reads and validates the file for `address`.
    ///
    /// Expired and corrupt files are deleted before returning.
    pub fn lookup(
        &self,
        address: &TileAddress,
        level: &Level,
        validator: &dyn PayloadValidator,
    ) -> DiskLookup {
        let path = self.tile_path(address, level);

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return DiskLookup::Missing,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat cached tile");
                return DiskLookup::Missing;
            }
        };
        let modified = metadata.modified().ok();

        if let (Some(expiry), Some(modified)) = (level.expiry(), modified) {
            if modified < expiry {
                debug!(tile = %address, path = %path.display(), "Cached tile expired");
                remove_quietly(&path);
                return DiskLookup::Expired;
            }
        }

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return DiskLookup::Missing,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cached tile");
                return DiskLookup::Missing;
            }
        };

        if let Err(e) = validator.validate(&data, level) {
            warn!(tile = %address, path = %path.display(), error = %e, "Removing corrupt cached tile");
            remove_quietly(&path);
            return DiskLookup::Corrupt;
        }

        DiskLookup::Hit(DiskFile {
            path,
            payload: Bytes::from(data),
            modified,
        })
    }

    /// Writes `payload` for `address` atomically and clears any absent marker.
    pub fn write(
        &self,
        address: &TileAddress,
        level: &Level,
        payload: &[u8],
    ) -> Result<PathBuf, CacheError> {
        let path = self.tile_path(address, level);
        write_atomic(&path, payload)?;
        remove_quietly(&absent_marker_path(&self.root, address, level.format_suffix()));
        Ok(path)
    }

    pub fn remove(&self, address: &TileAddress, level: &Level) -> bool {
        fs::remove_file(self.tile_path(address, level)).is_ok()
    }

    /// Records that the origin has no tile at `address`.
    pub fn mark_absent(&self, address: &TileAddress, level: &Level) -> Result<(), CacheError> {
        let marker = absent_marker_path(&self.root, address, level.format_suffix());
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        fs::write(&marker, b"").map_err(|e| CacheError::io(&marker, e))
    }

    /// Returns true while an absent marker younger than `recheck` exists.
    ///
    /// Older markers are removed so the tile becomes fetchable again.
    pub fn is_marked_absent(&self, address: &TileAddress, level: &Level, recheck: Duration) -> bool {
        let marker = absent_marker_path(&self.root, address, level.format_suffix());
        let modified = match fs::metadata(&marker).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age < recheck {
            return true;
        }
        debug!(tile = %address, "Absent marker aged out");
        remove_quietly(&marker);
        false
    }

    /// Counts tiles and markers under the root.
    pub fn stats(&self) -> Result<DiskStats, CacheError> {
        let mut stats = DiskStats::default();
        collect_stats(&self.root, &mut stats)?;
        Ok(stats)
    }

    /// Counts tiles and markers of one namespace.
    pub fn namespace_stats(&self, namespace: &str) -> Result<DiskStats, CacheError> {
        let mut stats = DiskStats::default();
        collect_stats(&self.root.join(namespace), &mut stats)?;
        Ok(stats)
    }

    /// Deletes every file of `namespace` and returns what was removed.
    pub fn clear_namespace(&self, namespace: &str) -> Result<DiskStats, CacheError> {
        let dir = self.root.join(namespace);
        let stats = self.namespace_stats(namespace)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(stats),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DiskStats::default()),
            Err(e) => Err(CacheError::io(dir, e)),
        }
    }
}

fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), CacheError> {
    let parent = path
        .parent()
        .ok_or_else(|| CacheError::io(path, io::Error::new(ErrorKind::InvalidInput, "no parent")))?;
    fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = parent.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    if let Err(e) = fs::write(&temp, payload) {
        remove_quietly(&temp);
        return Err(CacheError::io(&temp, e));
    }
    if let Err(e) = fs::rename(&temp, path) {
        remove_quietly(&temp);
        return Err(CacheError::io(path, e));
    }
    Ok(())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove cache file");
        }
    }
}

fn collect_stats(dir: &Path, stats: &mut DiskStats) -> Result<(), CacheError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(CacheError::io(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| CacheError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| CacheError::io(entry.path(), e))?;
        if file_type.is_dir() {
            collect_stats(&entry.path(), stats)?;
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') && name.ends_with(".tmp") {
            continue;
        }
        if name.ends_with(".absent") {
            stats.absent_markers += 1;
        } else {
            stats.files += 1;
            stats.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    Ok(())
}
