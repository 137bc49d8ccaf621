//! In-memory tier backed by moka.
//!
//! Entries are weighted by payload size so the budget is expressed in bytes.
//! moka evicts least-recently-used entries once the budget is exceeded.
//! Every operation is non-blocking and performs no I/O.

use std::sync::Arc;

use moka::sync::Cache as MokaCache;

use super::types::CacheEntry;
use crate::tile::TileAddress;

/// Bounded `TileAddress -> CacheEntry` map.
#[derive(Clone)]
pub struct MemoryTier {
    cache: MokaCache<TileAddress, Arc<CacheEntry>>,
    max_size_bytes: u64,
}

impl MemoryTier {
    /// Creates a memory tier holding at most `max_size_bytes` of payload.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            .weigher(|_key: &TileAddress, entry: &Arc<CacheEntry>| -> u32 {
                entry.size_bytes().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            max_size_bytes,
        }
    }

    pub fn get(&self, address: &TileAddress) -> Option<Arc<CacheEntry>> {
        self.cache.get(address)
    }

    /// Inserts `entry`, replacing any entry for the same address.
    pub fn insert(&self, entry: CacheEntry) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        self.cache.insert(entry.address().clone(), Arc::clone(&entry));
        entry
    }

    pub fn remove(&self, address: &TileAddress) -> Option<Arc<CacheEntry>> {
        self.cache.remove(address)
    }

    pub fn contains(&self, address: &TileAddress) -> bool {
        self.cache.contains_key(address)
    }

    /// Drops every entry of `namespace`.
    pub fn invalidate_namespace(&self, namespace: &str) {
        let stale: Vec<TileAddress> = self
            .cache
            .iter()
            .filter(|(address, _)| address.cache_namespace() == namespace)
            .map(|(address, _)| (*address).clone())
            .collect();
        for address in stale {
            self.cache.invalidate(&address);
        }
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Total payload bytes held, after pending maintenance.
    pub fn size_bytes(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.weighted_size()
    }

    /// Number of entries held, after pending maintenance.
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }
}
