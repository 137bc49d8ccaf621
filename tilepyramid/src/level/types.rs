//! A single resolution tier.

use std::sync::Arc;
use std::time::SystemTime;

/// Per-tile extent of a level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TileDelta {
    /// Rectangular tiles: degrees of latitude and longitude per tile.
    Angular { lat: f64, lon: f64 },
    /// Curtain tiles: fraction of the path and of the height per tile.
    Path { along: f64, vertical: f64 },
}

/// One resolution tier of a level set.
///
/// Levels are built by [`super::LevelSetConfig`] or
/// [`super::CurtainLevelSetConfig`] and are immutable afterwards.
#[derive(Debug, Clone)]
pub struct Level {
    pub(super) number: u32,
    pub(super) tile_width: u32,
    pub(super) tile_height: u32,
    pub(super) dataset_name: String,
    pub(super) cache_namespace: Arc<str>,
    pub(super) format_suffix: String,
    pub(super) service: String,
    pub(super) delta: TileDelta,
    /// Tile origin as `(lat, lon)` or `(vertical, along)`.
    pub(super) origin: (f64, f64),
    pub(super) empty: bool,
    pub(super) expiry: Option<SystemTime>,
}

impl Level {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn cache_namespace(&self) -> &str {
        &self.cache_namespace
    }

    pub(crate) fn shared_namespace(&self) -> Arc<str> {
        Arc::clone(&self.cache_namespace)
    }

    /// File suffix of cached tiles, without the leading dot.
    pub fn format_suffix(&self) -> &str {
        &self.format_suffix
    }

    /// Service locator the URL builder expands.
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn delta(&self) -> TileDelta {
        self.delta
    }

    /// Tile origin as `(lat, lon)` for rectangular levels.
    pub fn origin(&self) -> (f64, f64) {
        self.origin
    }

    /// Returns true for placeholder levels that are never fetched.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Cached files last modified before this instant are stale.
    pub fn expiry(&self) -> Option<SystemTime> {
        self.expiry
    }

    /// Size of one texel: tile delta divided by the pixel count on that axis.
    pub fn texel_size(&self) -> f64 {
        match self.delta {
            TileDelta::Angular { lat, .. } => lat / self.tile_height as f64,
            TileDelta::Path { along, .. } => along / self.tile_width as f64,
        }
    }

    /// Relative cache path of this level: `{cache_namespace}/{number}`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.cache_namespace, self.number)
    }

    /// Bounds of tile `row`/`col` on this level as `(min_lat, max_lat, min_lon, max_lon)`.
    ///
    /// Returns `None` for curtain levels.
    pub fn tile_bounds(&self, row: i32, col: i32) -> Option<(f64, f64, f64, f64)> {
        match self.delta {
            TileDelta::Angular { lat, lon } => {
                let min_lat = self.origin.0 + row as f64 * lat;
                let min_lon = self.origin.1 + col as f64 * lon;
                Some((min_lat, min_lat + lat, min_lon, min_lon + lon))
            }
            TileDelta::Path { .. } => None,
        }
    }
}
