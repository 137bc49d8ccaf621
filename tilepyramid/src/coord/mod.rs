//! Geographic and path-relative extents.
//!
//! Provides the two extent types the tile pyramid is built on:
//!
//! - [`Region`]: a rectangular latitude/longitude box (or any `x/y` box in a
//!   parametric CRS) used by rectangular tiling.
//! - [`PathSegment`]: a sub-range of a linear path with a vertical extent,
//!   used by curtain tiling.
//!
//! Both are plain `Copy` values, immutable after construction and safe to
//! share between the rendering thread and retrieval workers without
//! synchronization.

mod region;
mod segment;

pub use region::{Quadrant, Region};
pub use segment::PathSegment;

/// Minimum latitude of the full sphere in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum latitude of the full sphere in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum longitude of the full sphere in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude of the full sphere in degrees.
pub const MAX_LON: f64 = 180.0;
