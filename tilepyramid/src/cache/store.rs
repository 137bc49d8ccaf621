//! Two-tier cache store.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use moka::sync::Cache as MokaCache;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::disk::{DiskLookup, DiskTier};
use super::memory::MemoryTier;
use super::types::{CacheEntry, CacheError};
use super::validate::{NonEmptyValidator, PayloadValidator};
use crate::level::Level;
use crate::tile::TileAddress;

/// Upper bound on addresses remembered as absent in memory.
const MAX_ABSENT_ENTRIES: u64 = 100_000;

/// Memory tier in front of a disk tier.
///
/// `get` is the per-frame fast path. Disk operations run on the blocking
/// pool and must be called from within a tokio runtime.
pub struct CacheStore {
    memory: MemoryTier,
    disk: DiskTier,
    validator: Arc<dyn PayloadValidator>,
    absent: Option<MokaCache<TileAddress, ()>>,
    absent_recheck: Duration,
}

impl CacheStore {
    /// Creates a store that accepts any non-empty payload from disk.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_validator(config, Arc::new(NonEmptyValidator))
    }

    /// Creates a store that checks disk payloads with `validator`.
    pub fn with_validator(config: &CacheConfig, validator: Arc<dyn PayloadValidator>) -> Self {
        let absent = (!config.absent_recheck.is_zero()).then(|| {
            MokaCache::builder()
                .max_capacity(MAX_ABSENT_ENTRIES)
                .time_to_live(config.absent_recheck)
                .build()
        });

        Self {
            memory: MemoryTier::new(config.memory_size),
            disk: DiskTier::new(&config.directory),
            validator,
            absent,
            absent_recheck: config.absent_recheck,
        }
    }

    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    pub fn disk(&self) -> &DiskTier {
        &self.disk
    }

    /// Memory-tier lookup. Never blocks and never touches the disk.
    pub fn get(&self, address: &TileAddress) -> Option<Arc<CacheEntry>> {
        self.memory.get(address)
    }

    /// Loads `address` from disk into the memory tier.
    ///
    /// Missing, expired and corrupt files all report `None`; expired and
    /// corrupt files are deleted.
    pub async fn lookup_on_disk(
        &self,
        address: &TileAddress,
        level: &Level,
    ) -> Option<Arc<CacheEntry>> {
        let disk = self.disk.clone();
        let validator = Arc::clone(&self.validator);
        let owned_address = address.clone();
        let owned_level = level.clone();

        let lookup = tokio::task::spawn_blocking(move || {
            disk.lookup(&owned_address, &owned_level, validator.as_ref())
        })
        .await;

        match lookup {
            Ok(DiskLookup::Hit(file)) => {
                debug!(tile = %address, "Disk cache hit");
                let entry = CacheEntry::new(address.clone(), file.payload, file.modified);
                Some(self.memory.insert(entry))
            }
            Ok(DiskLookup::Expired) => {
                debug!(tile = %address, "Disk cache entry expired");
                None
            }
            Ok(DiskLookup::Missing) | Ok(DiskLookup::Corrupt) => None,
            Err(e) => {
                warn!(tile = %address, error = %e, "Disk lookup task failed");
                None
            }
        }
    }

    /// Writes `payload` to disk, then makes it visible in memory.
    ///
    /// Promoting the same payload twice leaves a single equivalent entry.
    pub async fn promote(
        &self,
        address: &TileAddress,
        level: &Level,
        payload: Bytes,
        source_last_modified: Option<SystemTime>,
    ) -> Result<Arc<CacheEntry>, CacheError> {
        let disk = self.disk.clone();
        let owned_address = address.clone();
        let owned_level = level.clone();
        let data = payload.clone();

        tokio::task::spawn_blocking(move || disk.write(&owned_address, &owned_level, &data))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))??;

        if let Some(absent) = &self.absent {
            absent.invalidate(address);
        }
        let entry = CacheEntry::new(address.clone(), payload, source_last_modified);
        Ok(self.memory.insert(entry))
    }

    /// Records that the origin reported `address` as absent.
    pub async fn mark_absent(&self, address: &TileAddress, level: &Level) {
        let Some(absent) = &self.absent else {
            return;
        };
        absent.insert(address.clone(), ());

        let disk = self.disk.clone();
        let owned_address = address.clone();
        let owned_level = level.clone();
        let result =
            tokio::task::spawn_blocking(move || disk.mark_absent(&owned_address, &owned_level))
                .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(tile = %address, error = %e, "Failed to write absent marker"),
            Err(e) => warn!(tile = %address, error = %e, "Absent marker task failed"),
        }
    }

    /// Returns true while `address` is on the absent list.
    pub async fn is_known_absent(&self, address: &TileAddress, level: &Level) -> bool {
        let Some(absent) = &self.absent else {
            return false;
        };
        if absent.contains_key(address) {
            return true;
        }

        let disk = self.disk.clone();
        let owned_address = address.clone();
        let owned_level = level.clone();
        let recheck = self.absent_recheck;
        let marked = tokio::task::spawn_blocking(move || {
            disk.is_marked_absent(&owned_address, &owned_level, recheck)
        })
        .await
        .unwrap_or(false);

        if marked {
            absent.insert(address.clone(), ());
        }
        marked
    }

    /// Memory-only absent check for callers that must not wait on disk.
    pub fn is_absent_in_memory(&self, address: &TileAddress) -> bool {
        self.absent
            .as_ref()
            .is_some_and(|absent| absent.contains_key(address))
    }

    /// Evicts `address` from both tiers.
    pub async fn remove(&self, address: &TileAddress, level: &Level) {
        self.memory.remove(address);
        let disk = self.disk.clone();
        let owned_address = address.clone();
        let owned_level = level.clone();
        let _ = tokio::task::spawn_blocking(move || disk.remove(&owned_address, &owned_level)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::validate::tests::png_bytes;
    use crate::cache::validate::ImageValidator;
    use crate::level::{LevelSet, LevelSetConfig};
    use crate::tile::TileKey;
    use tempfile::TempDir;

    fn levels() -> LevelSet {
        LevelSetConfig::new("bmng", "earth/bmng", "https://tiles.example.com")
            .with_format_suffix("png")
            .with_tile_size(4, 4)
            .build()
            .unwrap()
    }

    fn store(dir: &TempDir) -> CacheStore {
        CacheStore::with_validator(
            &CacheConfig::new(dir.path()).with_memory_size(1024 * 1024),
            Arc::new(ImageValidator::new()),
        )
    }

    #[tokio::test]
    async fn test_get_after_promote_hits() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 2, 3).into();

        assert!(store.get(&address).is_none());
        store
            .promote(&address, level, Bytes::from(png_bytes(4, 4)), None)
            .await
            .unwrap();
        assert!(store.get(&address).is_some());
        assert!(store.disk().tile_path(&address, level).exists());
    }

    #[tokio::test]
    async fn test_promote_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 2, 3).into();
        let payload = Bytes::from(png_bytes(4, 4));

        store.promote(&address, level, payload.clone(), None).await.unwrap();
        let first = store.get(&address).unwrap();
        store.promote(&address, level, payload.clone(), None).await.unwrap();
        let second = store.get(&address).unwrap();

        assert_eq!(first.address(), second.address());
        assert_eq!(first.payload(), second.payload());
        assert_eq!(store.memory().entry_count(), 1);
        assert_eq!(store.disk().stats().unwrap().files, 1);
    }

    #[tokio::test]
    async fn test_lookup_on_disk_populates_memory() {
        let dir = TempDir::new().unwrap();
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 2, 3).into();

        store(&dir)
            .promote(&address, level, Bytes::from(png_bytes(4, 4)), None)
            .await
            .unwrap();

        // Fresh store over the same directory: cold memory, warm disk.
        let store = store(&dir);
        assert!(store.get(&address).is_none());
        assert!(store.lookup_on_disk(&address, level).await.is_some());
        assert!(store.get(&address).is_some());
    }

    #[tokio::test]
    async fn test_corrupt_disk_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 2, 3).into();
        let path = store.disk().write(&address, level, b"garbage").unwrap();

        assert!(store.lookup_on_disk(&address, level).await.is_none());
        assert!(!path.exists());
        assert!(store.get(&address).is_none());
    }

    #[tokio::test]
    async fn test_absent_list() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 5, 5).into();

        assert!(!store.is_known_absent(&address, level).await);
        store.mark_absent(&address, level).await;
        assert!(store.is_absent_in_memory(&address));
        assert!(store.is_known_absent(&address, level).await);

        // The marker survives a restart.
        let restarted = self::store(&dir);
        assert!(restarted.is_known_absent(&address, level).await);

        restarted
            .promote(&address, level, Bytes::from(png_bytes(4, 4)), None)
            .await
            .unwrap();
        assert!(!restarted.is_known_absent(&address, level).await);
    }

    #[tokio::test]
    async fn test_zero_recheck_disables_absent_list() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(
            &CacheConfig::new(dir.path()).with_absent_recheck(Duration::ZERO),
        );
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 5, 5).into();

        store.mark_absent(&address, level).await;
        assert!(!store.is_known_absent(&address, level).await);
    }

    #[tokio::test]
    async fn test_remove_evicts_both_tiers() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 2, 3).into();
        store
            .promote(&address, level, Bytes::from(png_bytes(4, 4)), None)
            .await
            .unwrap();

        store.remove(&address, level).await;
        assert!(store.get(&address).is_none());
        assert!(store.lookup_on_disk(&address, level).await.is_none());
    }
}
