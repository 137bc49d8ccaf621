//! Curtain level sets: tiling along a path.

use std::sync::Arc;
use std::time::SystemTime;

use super::types::{Level, TileDelta};
use super::{
    ideal_level_index, select_non_empty, validate_counts, validate_delta, validate_index_range,
    LevelSetError, DEFAULT_TILE_SIZE, INDEX_EPSILON,
};
use crate::coord::PathSegment;
use crate::tile::CurtainTileKey;

/// Default number of levels in a curtain level set.
const DEFAULT_CURTAIN_LEVELS: u32 = 8;

/// Typed configuration for a [`CurtainLevelSet`].
#[derive(Debug, Clone)]
pub struct CurtainLevelSetConfig {
    pub dataset_name: String,
    pub cache_namespace: String,
    pub service: String,
    pub format_suffix: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub num_levels: u32,
    pub num_empty_levels: u32,
    /// Fraction of the path covered by one level-zero tile.
    pub level_zero_delta: f64,
    /// Fraction of the height covered by one tile at every level.
    pub vertical_delta: f64,
    pub expiry: Option<SystemTime>,
}

impl CurtainLevelSetConfig {
    /// Creates a configuration where one level-zero tile spans the whole path.
    pub fn new(
        dataset_name: impl Into<String>,
        cache_namespace: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            cache_namespace: cache_namespace.into(),
            service: service.into(),
            format_suffix: "png".to_string(),
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            num_levels: DEFAULT_CURTAIN_LEVELS,
            num_empty_levels: 0,
            level_zero_delta: 1.0,
            vertical_delta: 1.0,
            expiry: None,
        }
    }

    pub fn with_num_levels(mut self, num_levels: u32) -> Self {
        self.num_levels = num_levels;
        self
    }

    pub fn with_num_empty_levels(mut self, num_empty_levels: u32) -> Self {
        self.num_empty_levels = num_empty_levels;
        self
    }

    pub fn with_level_zero_delta(mut self, along: f64) -> Self {
        self.level_zero_delta = along;
        self
    }

    pub fn with_vertical_delta(mut self, vertical: f64) -> Self {
        self.vertical_delta = vertical;
        self
    }

    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_width = width;
        self.tile_height = height;
        self
    }

    pub fn with_format_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.format_suffix = suffix.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_expiry(mut self, expiry: SystemTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn build(self) -> Result<CurtainLevelSet, LevelSetError> {
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
        validate_delta("path", self.level_zero_delta)?;
        validate_delta("vertical", self.vertical_delta)?;
        validate_index_range(self.num_levels, 1.0, self.level_zero_delta)?;
        if (1.0 / self.vertical_delta).ceil() > f64::from(i32::MAX) {
            return Err(LevelSetError::InvalidDelta {
                axis: "vertical",
                value: self.vertical_delta,
            });
        }

        let namespace: Arc<str> = Arc::from(self.cache_namespace.as_str());
        let levels = (0..self.num_levels)
            .map(|number| Level {
                number,
                tile_width: self.tile_width,
                tile_height: self.tile_height,
                dataset_name: self.dataset_name.clone(),
                cache_namespace: Arc::clone(&namespace),
                format_suffix: self.format_suffix.clone(),
                service: self.service.clone(),
                delta: TileDelta::Path {
                    along: self.level_zero_delta / f64::from(1u32 << number),
                    vertical: self.vertical_delta,
                },
                origin: (0.0, 0.0),
                empty: number < self.num_empty_levels,
                expiry: self.expiry,
            })
            .collect();

        Ok(CurtainLevelSet {
            levels,
            level_zero_delta: self.level_zero_delta,
            vertical_delta: self.vertical_delta,
            num_empty_levels: self.num_empty_levels,
        })
    }
}

/// Resolution tiers of a path-following dataset.
///
/// The along-path delta halves at every level; the vertical delta does not
/// subdivide independently of the source resolution and is the same at
/// every level.
#[derive(Debug, Clone)]
pub struct CurtainLevelSet {
    levels: Vec<Level>,
    level_zero_delta: f64,
    vertical_delta: f64,
    num_empty_levels: u32,
}

impl CurtainLevelSet {
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

    pub fn level_zero_delta(&self) -> f64 {
        self.level_zero_delta
    }

    pub fn vertical_delta(&self) -> f64 {
        self.vertical_delta
    }

    /// Level for a requested along-path delta, with the empty-level fallback.
    pub fn level_for_resolution(&self, resolution: f64) -> &Level {
        let ideal = ideal_level_index(self.level_zero_delta, resolution, self.levels.len());
        &self.levels[select_non_empty(&self.levels, ideal)]
    }

    /// Segment covered by tile `row`/`col` of `level`.
    pub fn segment_for(&self, level: &Level, row: i32, col: i32) -> PathSegment {
        let along = along_delta(level);
        PathSegment::new(
            col as f64 * along,
            (col + 1) as f64 * along,
            row as f64 * self.vertical_delta,
            (row + 1) as f64 * self.vertical_delta,
        )
    }

    /// Tiles of `level` covering `segment` of path number `segment_index`.
    pub fn tiles_intersecting(
        &self,
        segment_index: usize,
        segment: &PathSegment,
        level: &Level,
    ) -> CurtainTileRange {
        let along = along_delta(level);
        let (low, high) = if segment.top <= segment.bottom {
            (segment.top, segment.bottom)
        } else {
            (segment.bottom, segment.top)
        };

        let cols = span(segment.start, segment.end, along);
        let rows = span(low, high, self.vertical_delta);

        CurtainTileRange {
            namespace: level.shared_namespace(),
            level: level.number(),
            along,
            vertical: self.vertical_delta,
            segment_index,
            first_col: cols.0,
            last_row: rows.1,
            last_col: cols.1,
            next_row: rows.0,
            next_col: cols.0,
        }
    }
}

fn along_delta(level: &Level) -> f64 {
    match level.delta() {
        TileDelta::Path { along, .. } => along,
        TileDelta::Angular { lon, .. } => lon,
    }
}

/// Index span of `min..=max` in `[0, 1]`, clamped to the valid tile indices.
fn span(min: f64, max: f64, delta: f64) -> (i32, i32) {
    let last_index = ((1.0 / delta - INDEX_EPSILON).ceil() as i32 - 1).max(0);
    let first = ((min / delta + INDEX_EPSILON).floor() as i32).clamp(0, last_index);
    let last = ((max / delta - INDEX_EPSILON).ceil() as i32 - 1).clamp(first, last_index);
    (first, last)
}

/// Lazy iterator over the curtain tiles of one level.
#[derive(Debug, Clone)]
pub struct CurtainTileRange {
    namespace: Arc<str>,
    level: u32,
    along: f64,
    vertical: f64,
    segment_index: usize,
    first_col: i32,
    last_row: i32,
    last_col: i32,
    next_row: i32,
    next_col: i32,
}

impl Iterator for CurtainTileRange {
    type Item = CurtainTileKey;

    fn next(&mut self) -> Option<CurtainTileKey> {
        if self.next_row > self.last_row || self.first_col > self.last_col {
            return None;
        }
        let (row, col) = (self.next_row, self.next_col);
        let segment = PathSegment::new(
            col as f64 * self.along,
            (col + 1) as f64 * self.along,
            row as f64 * self.vertical,
            (row + 1) as f64 * self.vertical,
        );
        let key = CurtainTileKey::new(
            self.level,
            row,
            col,
            Arc::clone(&self.namespace),
            self.segment_index,
            segment,
        );
        if self.next_col == self.last_col {
            self.next_col = self.first_col;
            self.next_row += 1;
        } else {
            self.next_col += 1;
        }
        Some(key)
    }
}
