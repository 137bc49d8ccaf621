//! Rectangular level sets and tile enumeration.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::SystemTime;

use super::types::{Level, TileDelta};
use super::{
    ideal_level_index, select_non_empty, validate_counts, validate_delta, validate_index_range,
    LevelSetError, DEFAULT_NUM_LEVELS, DEFAULT_TILE_SIZE, INDEX_EPSILON,
};
use crate::coord::Region;
use crate::tile::TileKey;

/// Typed configuration for a rectangular [`LevelSet`].
///
/// Every field has a default except the three identity strings. The
/// configuration is validated once, in [`LevelSetConfig::build`].
#[derive(Debug, Clone)]
pub struct LevelSetConfig {
    pub dataset_name: String,
    pub cache_namespace: String,
    pub service: String,
    pub format_suffix: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub num_levels: u32,
    pub num_empty_levels: u32,
    pub level_zero_delta_lat: f64,
    pub level_zero_delta_lon: f64,
    pub sector: Region,
    /// Tile origin `(lat, lon)`; defaults to the south-west corner of `sector`.
    pub origin: Option<(f64, f64)>,
    pub expiry: Option<SystemTime>,
}

impl LevelSetConfig {
    /// Creates a configuration covering the full sphere with 36° level-zero tiles.
    pub fn new(
        dataset_name: impl Into<String>,
        cache_namespace: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            cache_namespace: cache_namespace.into(),
            service: service.into(),
            format_suffix: "jpg".to_string(),
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            num_levels: DEFAULT_NUM_LEVELS,
            num_empty_levels: 0,
            level_zero_delta_lat: 36.0,
            level_zero_delta_lon: 36.0,
            sector: Region::full_sphere(),
            origin: None,
            expiry: None,
        }
    }

    pub fn with_format_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.format_suffix = suffix.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_width = width;
        self.tile_height = height;
        self
    }

    pub fn with_num_levels(mut self, num_levels: u32) -> Self {
        self.num_levels = num_levels;
        self
    }

    pub fn with_num_empty_levels(mut self, num_empty_levels: u32) -> Self {
        self.num_empty_levels = num_empty_levels;
        self
    }

    pub fn with_level_zero_delta(mut self, lat: f64, lon: f64) -> Self {
        self.level_zero_delta_lat = lat;
        self.level_zero_delta_lon = lon;
        self
    }

    pub fn with_sector(mut self, sector: Region) -> Self {
        self.sector = sector;
        self
    }

    pub fn with_origin(mut self, lat: f64, lon: f64) -> Self {
        self.origin = Some((lat, lon));
        self
    }

    pub fn with_expiry(mut self, expiry: SystemTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Validates the configuration and builds the level set.
    pub fn build(self) -> Result<LevelSet, LevelSetError> {
        if self.dataset_name.trim().is_empty() {
            return Err(LevelSetError::EmptyName("dataset name"));
        }
        if self.cache_namespace.trim().is_empty() {
            return Err(LevelSetError::EmptyName("cache namespace"));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(LevelSetError::InvalidTileSize {
                width: self.tile_width,
                height: self.tile_height,
            });
        }
        validate_counts(self.num_levels, self.num_empty_levels)?;
        validate_delta("latitude", self.level_zero_delta_lat)?;
        validate_delta("longitude", self.level_zero_delta_lon)?;

        let origin = self
            .origin
            .unwrap_or((self.sector.min_lat, self.sector.min_lon));
        let lat_extent = (self.sector.min_lat - origin.0)
            .abs()
            .max((self.sector.max_lat - origin.0).abs());
        let lon_extent = (self.sector.min_lon - origin.1)
            .abs()
            .max((self.sector.max_lon - origin.1).abs());
        validate_index_range(self.num_levels, lat_extent, self.level_zero_delta_lat)?;
        validate_index_range(self.num_levels, lon_extent, self.level_zero_delta_lon)?;
        let namespace: Arc<str> = Arc::from(self.cache_namespace.as_str());

        let levels = (0..self.num_levels)
            .map(|number| {
                let scale = f64::from(1u32 << number);
                Level {
                    number,
                    tile_width: self.tile_width,
                    tile_height: self.tile_height,
                    dataset_name: self.dataset_name.clone(),
                    cache_namespace: Arc::clone(&namespace),
                    format_suffix: self.format_suffix.clone(),
                    service: self.service.clone(),
                    delta: TileDelta::Angular {
                        lat: self.level_zero_delta_lat / scale,
                        lon: self.level_zero_delta_lon / scale,
                    },
                    origin,
                    empty: number < self.num_empty_levels,
                    expiry: self.expiry,
                }
            })
            .collect();

        Ok(LevelSet {
            levels,
            sector: self.sector,
            origin,
            level_zero_delta: (self.level_zero_delta_lat, self.level_zero_delta_lon),
            num_empty_levels: self.num_empty_levels,
        })
    }
}

/// Ordered resolution tiers over a bounding region.
///
/// Invariant: `levels[i]` has a per-tile delta of `level_zero_delta / 2^i`
/// on both axes.
#[derive(Debug, Clone)]
pub struct LevelSet {
    levels: Vec<Level>,
    sector: Region,
    origin: (f64, f64),
    level_zero_delta: (f64, f64),
    num_empty_levels: u32,
}

impl LevelSet {
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, number: u32) -> Option<&Level> {
        self.levels.get(number as usize)
    }

    pub fn num_levels(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn num_empty_levels(&self) -> u32 {
        self.num_empty_levels
    }

    /// Coarsest non-empty level.
    pub fn first_level(&self) -> &Level {
        &self.levels[select_non_empty(&self.levels, 0)]
    }

    /// Finest level.
    pub fn last_level(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }

    /// Bounding region of the data.
    pub fn sector(&self) -> &Region {
        &self.sector
    }

    /// Tile origin as `(lat, lon)`.
    pub fn origin(&self) -> (f64, f64) {
        self.origin
    }

    /// Level-zero tile delta as `(lat, lon)` in degrees.
    pub fn level_zero_delta(&self) -> (f64, f64) {
        self.level_zero_delta
    }

    /// Level to use for a requested per-tile latitude delta in degrees.
    ///
    /// Picks the coarsest level whose tile delta is no larger than
    /// `resolution`, clamped to the available levels, then applies the
    /// empty-level fallback described in the [module docs](super).
    /// Finer resolutions never select a coarser level.
    pub fn level_for_resolution(&self, resolution: f64) -> &Level {
        let ideal = ideal_level_index(self.level_zero_delta.0, resolution, self.levels.len());
        &self.levels[select_non_empty(&self.levels, ideal)]
    }

    /// Level to use for a requested texel size in degrees per pixel.
    pub fn level_for_texel_size(&self, texel_size: f64) -> &Level {
        let tile_height = f64::from(self.levels[0].tile_height);
        self.level_for_resolution(texel_size * tile_height)
    }

    /// Tiles of `level` that intersect `region`, clamped to the level set's sector.
    ///
    /// The returned iterator is lazy. A region outside the sector yields an
    /// empty iterator. `region` must not straddle the antimeridian.
    pub fn tiles_intersecting(&self, region: &Region, level: &Level) -> TileRange {
        let (delta_lat, delta_lon) = match level.delta() {
            TileDelta::Angular { lat, lon } => (lat, lon),
            TileDelta::Path { .. } => return TileRange::empty(level),
        };

        let Some(clipped) = region.intersect(&self.sector) else {
            return TileRange::empty(level);
        };
        // A view with extent that only touches the sector edge covers no tile.
        let touches_only = (region.delta_lat() > 0.0 && clipped.delta_lat() <= 0.0)
            || (region.delta_lon() > 0.0 && clipped.delta_lon() <= 0.0);
        if touches_only {
            return TileRange::empty(level);
        }

        let sector_rows = index_span(self.sector.min_lat, self.sector.max_lat, self.origin.0, delta_lat);
        let sector_cols = index_span(self.sector.min_lon, self.sector.max_lon, self.origin.1, delta_lon);
        let rows = index_span(clipped.min_lat, clipped.max_lat, self.origin.0, delta_lat);
        let cols = index_span(clipped.min_lon, clipped.max_lon, self.origin.1, delta_lon);

        TileRange::new(
            level,
            clamp_span(rows, sector_rows),
            clamp_span(cols, sector_cols),
        )
    }

    /// All tiles of level zero covering the sector.
    pub fn top_level_tiles(&self) -> TileRange {
        self.tiles_intersecting(&self.sector, &self.levels[0])
    }

    /// Tile of `level` containing a point, or `None` outside the sector.
    pub fn tile_for_location(&self, lat: f64, lon: f64, level: &Level) -> Option<TileKey> {
        if !self.sector.contains(lat, lon) {
            return None;
        }
        self.tiles_intersecting(&Region::from_degrees(lat, lat, lon, lon), level)
            .next()
    }

    /// Geographic region covered by a tile.
    pub fn tile_region(&self, key: &TileKey) -> Option<Region> {
        let (min_lat, max_lat, min_lon, max_lon) =
            self.level(key.level())?.tile_bounds(key.row(), key.col())?;
        Some(Region {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }
}

/// Index range covering `min..=max` with tiles of size `delta` from `origin`.
///
/// A `max` exactly on a tile edge does not pull in the tile beyond it.
fn index_span(min: f64, max: f64, origin: f64, delta: f64) -> (i32, i32) {
    let first = ((min - origin) / delta + INDEX_EPSILON).floor() as i32;
    let last = (((max - origin) / delta - INDEX_EPSILON).ceil() as i32 - 1).max(first);
    (first, last)
}

/// Clamps both ends into `bounds`. A point on the far edge of the sector maps
/// to the last tile rather than one past it.
fn clamp_span(span: (i32, i32), bounds: (i32, i32)) -> (i32, i32) {
    (
        span.0.clamp(bounds.0, bounds.1),
        span.1.clamp(bounds.0, bounds.1),
    )
}

/// Lazy row-major iterator over the tiles of one level.
///
/// Rows ascend (south to north) and columns ascend (west to east) within
/// each row. Callers may stop early; nothing is materialised up front.
#[derive(Debug, Clone)]
pub struct TileRange {
    namespace: Arc<str>,
    level: u32,
    first_col: i32,
    last_row: i32,
    last_col: i32,
    next_row: i32,
    next_col: i32,
}

impl TileRange {
    fn new(level: &Level, rows: (i32, i32), cols: (i32, i32)) -> Self {
        Self {
            namespace: level.shared_namespace(),
            level: level.number(),
            first_col: cols.0,
            last_row: rows.1,
            last_col: cols.1,
            next_row: rows.0,
            next_col: cols.0,
        }
    }

    fn empty(level: &Level) -> Self {
        Self::new(level, (0, -1), (0, -1))
    }

    /// Remaining row indices.
    pub fn rows(&self) -> RangeInclusive<i32> {
        self.next_row..=self.last_row
    }

    /// Column indices of every row.
    pub fn cols(&self) -> RangeInclusive<i32> {
        self.first_col..=self.last_col
    }

    fn remaining(&self) -> usize {
        if self.next_row > self.last_row || self.first_col > self.last_col {
            return 0;
        }
        let width = (self.last_col - self.first_col + 1) as usize;
        let full_rows = (self.last_row - self.next_row) as usize;
        full_rows * width + (self.last_col - self.next_col + 1) as usize
    }
}

impl Iterator for TileRange {
    type Item = TileKey;

    fn next(&mut self) -> Option<TileKey> {
        if self.next_row > self.last_row || self.first_col > self.last_col {
            return None;
        }
        let key = TileKey::new(
            self.level,
            self.next_row,
            self.next_col,
            Arc::clone(&self.namespace),
        );
        if self.next_col == self.last_col {
            self.next_col = self.first_col;
            self.next_row += 1;
        } else {
            self.next_col += 1;
        }
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for TileRange {}
