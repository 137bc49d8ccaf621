//! Curtain (path-following) tile keys.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::coord::PathSegment;
use crate::level::Level;

/// Identity of a curtain tile.
///
/// A curtain tile covers a [`PathSegment`] of path number `segment_index`.
/// Its identity is `(level, row, col, cache namespace, segment index)`; the
/// segment itself is derived from `col`/`row` and the level's deltas, so it
/// takes no part in equality or hashing.
#[derive(Debug, Clone)]
pub struct CurtainTileKey {
    level: u32,
    row: i32,
    col: i32,
    cache_namespace: Arc<str>,
    segment_index: usize,
    segment: PathSegment,
}

impl CurtainTileKey {
    pub fn new(
        level: u32,
        row: i32,
        col: i32,
        cache_namespace: impl Into<Arc<str>>,
        segment_index: usize,
        segment: PathSegment,
    ) -> Self {
        Self {
            level,
            row,
            col,
            cache_namespace: cache_namespace.into(),
            segment_index,
            segment,
        }
    }

    pub fn for_level(
        level: &Level,
        row: i32,
        col: i32,
        segment_index: usize,
        segment: PathSegment,
    ) -> Self {
        Self {
            level: level.number(),
            row,
            col,
            cache_namespace: level.shared_namespace(),
            segment_index,
            segment,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn row(&self) -> i32 {
        self.row
    }

    pub fn col(&self) -> i32 {
        self.col
    }

    pub fn cache_namespace(&self) -> &str {
        &self.cache_namespace
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub fn segment(&self) -> &PathSegment {
        &self.segment
    }

    /// The two children at `child_level`.
    ///
    /// Only the along-path range is split; the row and the vertical extent
    /// are inherited from this tile.
    pub fn create_children(&self, child_level: &Level) -> [CurtainTileKey; 2] {
        let [first, second] = self.segment.subdivide_along_path();
        [
            CurtainTileKey::for_level(
                child_level,
                self.row,
                2 * self.col,
                self.segment_index,
                first,
            ),
            CurtainTileKey::for_level(
                child_level,
                self.row,
                2 * self.col + 1,
                self.segment_index,
                second,
            ),
        ]
    }
}

impl PartialEq for CurtainTileKey {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
            && self.row == other.row
            && self.col == other.col
            && self.segment_index == other.segment_index
            && self.cache_namespace == other.cache_namespace
    }
}

impl Eq for CurtainTileKey {}

impl Hash for CurtainTileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.row.hash(state);
        self.col.hash(state);
        self.segment_index.hash(state);
        self.cache_namespace.hash(state);
    }
}

impl fmt::Display for CurtainTileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}#{}",
            self.cache_namespace, self.level, self.row, self.col, self.segment_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::CurtainLevelSetConfig;

    #[test]
    fn test_equality_ignores_segment_values() {
        let a = CurtainTileKey::new(2, 0, 3, "profile", 0, PathSegment::new(0.75, 1.0, 0.0, 1.0));
        let b = CurtainTileKey::new(2, 0, 3, "profile", 0, PathSegment::FULL);
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_includes_segment_index() {
        let a = CurtainTileKey::new(2, 0, 3, "profile", 0, PathSegment::FULL);
        let b = CurtainTileKey::new(2, 0, 3, "profile", 1, PathSegment::FULL);
        assert_ne!(a, b);
    }

    #[test]
    fn test_children_split_along_path_only() {
        let levels = CurtainLevelSetConfig::new("radar", "curtain/radar", "https://c.example.com")
            .build()
            .unwrap();
        let parent = CurtainTileKey::for_level(
            levels.level(1).unwrap(),
            0,
            1,
            0,
            PathSegment::new(0.5, 1.0, 0.2, 0.8),
        );

        let [a, b] = parent.create_children(levels.level(2).unwrap());
        assert_eq!((a.level(), a.row(), a.col()), (2, 0, 2));
        assert_eq!((b.level(), b.row(), b.col()), (2, 0, 3));
        assert_eq!(*a.segment(), PathSegment::new(0.5, 0.75, 0.2, 0.8));
        assert_eq!(*b.segment(), PathSegment::new(0.75, 1.0, 0.2, 0.8));
    }
}
