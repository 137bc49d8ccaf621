//! Resolution tiers of a tile pyramid.
//!
//! A [`LevelSet`] is an ordered list of [`Level`]s where each level halves
//! the per-tile delta of its parent. Level sets answer the two questions a
//! renderer asks every frame:
//!
//! 1. Which level matches the resolution I need? ([`LevelSet::level_for_resolution`])
//! 2. Which tiles of that level cover my view? ([`LevelSet::tiles_intersecting`])
//!
//! # Empty levels
//!
//! Sources that have no data at coarse resolutions declare the first
//! `num_empty_levels` levels empty. Empty levels keep their number so level
//! numbering stays continuous, but they are never selected for retrieval.
//! When the ideal level is empty, selection falls back to the next coarser
//! non-empty level, and if every coarser level is empty, to the coarsest
//! non-empty level above it. Level numbers are never re-indexed.
//!
//! # Curtain levels
//!
//! [`CurtainLevelSet`] applies the same halving along a path while the
//! vertical extent keeps the level-zero delta at every level.

mod curtain;
mod set;
mod types;

pub use curtain::{CurtainLevelSet, CurtainLevelSetConfig, CurtainTileRange};
pub use set::{LevelSet, LevelSetConfig, TileRange};
pub use types::{Level, TileDelta};

use thiserror::Error;

/// Tolerance used when converting coordinates to row/column indices so that
/// values landing exactly on a tile edge are not pushed across it by
/// floating-point rounding.
pub(crate) const INDEX_EPSILON: f64 = 1e-9;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Default number of levels in a level set.
pub const DEFAULT_NUM_LEVELS: u32 = 5;

/// Errors raised while building a level set from configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LevelSetError {
    /// The level set would contain no levels.
    #[error("level set must contain at least one level")]
    NoLevels,

    /// Every level would be empty.
    #[error("{empty} empty levels leaves no data in a set of {total} levels")]
    TooManyEmptyLevels { empty: u32, total: u32 },

    /// A level-zero delta is zero, negative or not finite.
    #[error("invalid level-zero delta for {axis}: {value}")]
    InvalidDelta { axis: &'static str, value: f64 },

    /// Tile pixel dimensions are zero.
    #[error("invalid tile size {width}x{height}")]
    InvalidTileSize { width: u32, height: u32 },

    /// A required name is empty.
    #[error("{0} must not be empty")]
    EmptyName(&'static str),

    /// The level count would overflow the halving arithmetic.
    #[error("too many levels: {0} (tile indices of the finest level would overflow)")]
    TooManyLevels(u32),
}

/// Maximum number of levels; `2^30` subdivisions exhausts `i32` row space.
pub const MAX_LEVELS: u32 = 30;

/// Validates the level counts shared by rectangular and curtain sets.
pub(crate) fn validate_counts(num_levels: u32, num_empty: u32) -> Result<(), LevelSetError> {
    if num_levels == 0 {
        return Err(LevelSetError::NoLevels);
    }
    if num_levels > MAX_LEVELS {
        return Err(LevelSetError::TooManyLevels(num_levels));
    }
    if num_empty >= num_levels {
        return Err(LevelSetError::TooManyEmptyLevels {
            empty: num_empty,
            total: num_levels,
        });
    }
    Ok(())
}

/// Rejects level counts whose finest level would index tiles beyond `i32`.
///
/// `extent` is the largest distance from the tile origin to an edge of the
/// covered area, in the same unit as `level_zero_delta`.
pub(crate) fn validate_index_range(
    num_levels: u32,
    extent: f64,
    level_zero_delta: f64,
) -> Result<(), LevelSetError> {
    let finest_delta = level_zero_delta / f64::from(1u32 << (num_levels - 1));
    if (extent / finest_delta).ceil() > f64::from(i32::MAX) {
        return Err(LevelSetError::TooManyLevels(num_levels));
    }
    Ok(())
}

pub(crate) fn validate_delta(axis: &'static str, value: f64) -> Result<(), LevelSetError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(LevelSetError::InvalidDelta { axis, value });
    }
    Ok(())
}

/// Ideal level index for a requested per-tile delta.
///
/// This is the coarsest level whose delta, `level_zero_delta / 2^n`, is no
/// larger than `resolution`, clamped to the available levels.
pub(crate) fn ideal_level_index(level_zero_delta: f64, resolution: f64, num_levels: usize) -> usize {
    let last = num_levels.saturating_sub(1);
    if !resolution.is_finite() || resolution <= 0.0 {
        return last;
    }
    let n = ((level_zero_delta / resolution).log2() - INDEX_EPSILON).ceil();
    if n <= 0.0 {
        0
    } else {
        (n as usize).min(last)
    }
}

/// Applies the empty-level fallback policy to an ideal level index.
pub(crate) fn select_non_empty(levels: &[Level], ideal: usize) -> usize {
    let ideal = ideal.min(levels.len().saturating_sub(1));
    if let Some(i) = (0..=ideal).rev().find(|&i| !levels[i].is_empty()) {
        return i;
    }
    (ideal + 1..levels.len())
        .find(|&i| !levels[i].is_empty())
        .unwrap_or(ideal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_level_index() {
        assert_eq!(ideal_level_index(36.0, 36.0, 5), 0);
        assert_eq!(ideal_level_index(36.0, 18.0, 5), 1);
        assert_eq!(ideal_level_index(36.0, 10.0, 5), 2);
        assert_eq!(ideal_level_index(36.0, 9.0, 5), 2);
        assert_eq!(ideal_level_index(36.0, 100.0, 5), 0);
        assert_eq!(ideal_level_index(36.0, 0.0001, 5), 4);
        assert_eq!(ideal_level_index(36.0, f64::NAN, 5), 4);
    }

    #[test]
    fn test_validate_counts() {
        assert_eq!(validate_counts(0, 0), Err(LevelSetError::NoLevels));
        assert_eq!(
            validate_counts(3, 3),
            Err(LevelSetError::TooManyEmptyLevels { empty: 3, total: 3 })
        );
        assert!(validate_counts(3, 2).is_ok());
        assert_eq!(validate_counts(31, 0), Err(LevelSetError::TooManyLevels(31)));
    }

    #[test]
    fn test_validate_index_range() {
        // 36° tiles over 360° of longitude: 10 * 2^(n-1) columns at level n-1.
        assert!(validate_index_range(28, 360.0, 36.0).is_ok());
        assert_eq!(
            validate_index_range(30, 360.0, 36.0),
            Err(LevelSetError::TooManyLevels(30))
        );
        assert!(validate_index_range(30, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_validate_delta() {
        assert!(validate_delta("lat", 36.0).is_ok());
        assert!(validate_delta("lat", 0.0).is_err());
        assert!(validate_delta("lat", f64::INFINITY).is_err());
    }
}
