//! Retrieval counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free retrieval counters.
#[derive(Debug, Default)]
pub struct RetrievalStats {
    requested: AtomicU64,
    deduplicated: AtomicU64,
    rejected: AtomicU64,
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    network_fetches: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    absent: AtomicU64,
}

/// Point-in-time copy of [`RetrievalStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requested: u64,
    /// Requests that joined a queued or in-flight fetch.
    pub deduplicated: u64,
    /// Requests dropped because the queue was full.
    pub rejected: u64,
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub network_fetches: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub absent: u64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl RetrievalStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter! {
        record_request => requested,
        record_dedup => deduplicated,
        record_rejected => rejected,
        record_memory_hit => memory_hits,
        record_disk_hit => disk_hits,
        record_network_fetch => network_fetches,
        record_success => succeeded,
        record_failure => failed,
        record_absent => absent,
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requested: self.requested.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            absent: self.absent.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested {}, deduplicated {}, rejected {}, memory hits {}, disk hits {}, \
             fetched {}, succeeded {}, failed {}, absent {}",
            self.requested,
            self.deduplicated,
            self.rejected,
            self.memory_hits,
            self.disk_hits,
            self.network_fetches,
            self.succeeded,
            self.failed,
            self.absent
        )
    }
}
