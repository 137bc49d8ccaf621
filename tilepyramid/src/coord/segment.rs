//! Path-relative segments for curtain tiling.

use std::fmt;

/// A sub-range of a linear path with a vertical extent.
///
/// `start`/`end` are fractions of the path length and `top`/`bottom` are
/// fractions of the curtain height, all in `[0, 1]`. `start <= end` holds
/// for every segment built by this module; the relative order of `top` and
/// `bottom` is whatever the source data uses and is not normalised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegment {
    pub start: f64,
    pub end: f64,
    pub top: f64,
    pub bottom: f64,
}

impl PathSegment {
    /// The entire path at full height.
    pub const FULL: PathSegment = PathSegment {
        start: 0.0,
        end: 1.0,
        top: 0.0,
        bottom: 1.0,
    };

    /// Creates a segment, clamping every component into `[0, 1]` and
    /// ordering `start`/`end`.
    pub fn new(start: f64, end: f64, top: f64, bottom: f64) -> Self {
        let start = start.clamp(0.0, 1.0);
        let end = end.clamp(0.0, 1.0);
        Self {
            start: start.min(end),
            end: start.max(end),
            top: top.clamp(0.0, 1.0),
            bottom: bottom.clamp(0.0, 1.0),
        }
    }

    pub fn horizontal_center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn vertical_center(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Length along the path.
    pub fn horizontal_delta(&self) -> f64 {
        self.end - self.start
    }

    /// Vertical extent, independent of `top`/`bottom` ordering.
    pub fn vertical_delta(&self) -> f64 {
        (self.bottom - self.top).abs()
    }

    /// Returns true if `position` along the path falls inside the segment.
    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position <= self.end
    }

    /// Overlap along the path, keeping this segment's vertical extent.
    pub fn intersect(&self, other: &PathSegment) -> Option<PathSegment> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start > end {
            return None;
        }
        Some(PathSegment {
            start,
            end,
            top: self.top,
            bottom: self.bottom,
        })
    }

    /// Splits `start..end` at its midpoint. `top` and `bottom` are inherited.
    pub fn subdivide_along_path(&self) -> [PathSegment; 2] {
        let mid = self.horizontal_center();
        [
            PathSegment {
                end: mid,
                ..*self
            },
            PathSegment {
                start: mid,
                ..*self
            },
        ]
    }
}

impl Default for PathSegment {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[path {:.4}..{:.4}, height {:.4}..{:.4}]",
            self.start, self.end, self.top, self.bottom
        )
    }
}
