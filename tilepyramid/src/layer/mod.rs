//! Tile layer facade.
//!
//! A [`TileLayer`] composes one dataset's [`LevelSet`] and [`TileSource`]
//! with a shared [`RetrievalCoordinator`]. A renderer calls
//! [`TileLayer::tiles_for_view`] every frame, then [`TileLayer::resolve`]
//! for each tile; tiles that are not ready are polled again next frame.
//!
//! [`FetchMode::Synchronous`] is passed explicitly by the few operations
//! (frame export, precise picking) that need a tile in the same frame.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::CacheEntry;
use crate::coord::Region;
use crate::level::{Level, LevelSet, TileRange};
use crate::provider::UrlError;
use crate::retrieval::{RetrievalCoordinator, RetrievalError, Submission, TileSource};
use crate::tile::{TileAddress, TileKey};

/// Pause before resubmitting to a full queue during prefetch.
const PREFETCH_BACKOFF: Duration = Duration::from_millis(20);

/// How `resolve` obtains a tile that is not in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Queue a fetch and return immediately.
    #[default]
    Async,
    /// Fetch on the calling task before returning.
    Synchronous,
}

/// Availability of a tile.
#[derive(Debug, Clone)]
pub enum TileStatus {
    Ready(Arc<CacheEntry>),
    /// Not available yet; ask again next frame.
    Pending,
    /// The origin has no data for this tile.
    Absent,
}

impl TileStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, TileStatus::Ready(_))
    }

    pub fn entry(&self) -> Option<&Arc<CacheEntry>> {
        match self {
            TileStatus::Ready(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Counts from a [`TileLayer::prefetch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchSummary {
    pub queued: usize,
    pub cached: usize,
    pub already_pending: usize,
}

impl PrefetchSummary {
    pub fn total(&self) -> usize {
        self.queued + self.cached + self.already_pending
    }
}

/// One dataset rendered from a tile pyramid.
pub struct TileLayer {
    name: String,
    levels: LevelSet,
    source: TileSource,
    coordinator: Arc<RetrievalCoordinator>,
}

impl TileLayer {
    pub fn new(
        name: impl Into<String>,
        levels: LevelSet,
        source: TileSource,
        coordinator: Arc<RetrievalCoordinator>,
    ) -> Self {
        Self {
            name: name.into(),
            levels,
            source,
            coordinator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    pub fn coordinator(&self) -> &Arc<RetrievalCoordinator> {
        &self.coordinator
    }

    /// Level matching `resolution` and the tiles of it covering `view`.
    pub fn tiles_for_view(&self, view: &Region, resolution: f64) -> (&Level, TileRange) {
        let level = self.levels.level_for_resolution(resolution);
        (level, self.levels.tiles_intersecting(view, level))
    }

    /// Returns the tile if it is in memory, otherwise obtains it per `mode`.
    ///
    /// In [`FetchMode::Async`] this never waits on I/O and never fails.
    pub async fn resolve(
        &self,
        key: &TileKey,
        mode: FetchMode,
    ) -> Result<TileStatus, RetrievalError> {
        let level = self.level_of(key)?;
        let address = TileAddress::Rect(key.clone());
        let cache = self.coordinator.cache();

        if let Some(entry) = cache.get(&address) {
            return Ok(TileStatus::Ready(entry));
        }
        if level.is_empty() {
            return Ok(TileStatus::Absent);
        }

        match mode {
            FetchMode::Async => {
                if cache.is_absent_in_memory(&address) {
                    return Ok(TileStatus::Absent);
                }
                self.coordinator.request_async(&address, level, &self.source);
                Ok(TileStatus::Pending)
            }
            FetchMode::Synchronous => {
                match self
                    .coordinator
                    .request_sync(&address, level, &self.source)
                    .await
                {
                    Ok(entry) => Ok(TileStatus::Ready(entry)),
                    Err(RetrievalError::Absent(_)) => Ok(TileStatus::Absent),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Queues every tile covering `region` at `resolution`.
    ///
    /// Waits out a full queue instead of dropping tiles. Use
    /// [`wait_idle`](Self::wait_idle) to wait for the downloads.
    pub async fn prefetch(&self, region: &Region, resolution: f64) -> PrefetchSummary {
        let (level, tiles) = self.tiles_for_view(region, resolution);
        let mut summary = PrefetchSummary::default();
        debug!(
            layer = %self.name,
            level = level.number(),
            tiles = tiles.len(),
            "Prefetching region"
        );

        for key in tiles {
            let address = TileAddress::Rect(key);
            loop {
                match self
                    .coordinator
                    .request_async(&address, level, &self.source)
                {
                    Submission::Queued => summary.queued += 1,
                    Submission::Cached => summary.cached += 1,
                    Submission::AlreadyPending => summary.already_pending += 1,
                    Submission::QueueFull => {
                        tokio::time::sleep(PREFETCH_BACKOFF).await;
                        continue;
                    }
                    Submission::EmptyLevel | Submission::Closed => return summary,
                }
                break;
            }
        }
        summary
    }

    /// Waits until the coordinator has no queued or in-flight requests.
    pub async fn wait_idle(&self) {
        self.coordinator.wait_idle().await;
    }

    fn level_of(&self, key: &TileKey) -> Result<&Level, RetrievalError> {
        if key.cache_namespace() != self.levels.first_level().cache_namespace() {
            return Err(UrlError::InvalidAddress(format!(
                "{} does not belong to layer {}",
                key, self.name
            ))
            .into());
        }
        self.levels.level(key.level()).ok_or_else(|| {
            UrlError::InvalidAddress(format!("{} is beyond the last level", key)).into()
        })
    }
}
