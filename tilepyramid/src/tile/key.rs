//! Rectangular tile keys.

use std::fmt;
use std::sync::Arc;

use crate::coord::Quadrant;
use crate::level::Level;

/// Identity of a rectangular tile.
///
/// Rows count northwards from the level set's tile origin and columns count
/// eastwards. The cache namespace is shared through an `Arc<str>` so cloning
/// a key during enumeration does not allocate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    level: u32,
    row: i32,
    col: i32,
    cache_namespace: Arc<str>,
}

impl TileKey {
    pub fn new(level: u32, row: i32, col: i32, cache_namespace: impl Into<Arc<str>>) -> Self {
        Self {
            level,
            row,
            col,
            cache_namespace: cache_namespace.into(),
        }
    }

    /// Creates a key for `row`/`col` at `level`, sharing the level's namespace.
    pub fn for_level(level: &Level, row: i32, col: i32) -> Self {
        Self {
            level: level.number(),
            row,
            col,
            cache_namespace: level.shared_namespace(),
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

    /// The child key covering `quadrant` of this tile at `child_level`.
    pub fn child(&self, child_level: &Level, quadrant: Quadrant) -> TileKey {
        TileKey::for_level(
            child_level,
            2 * self.row + quadrant.row_offset(),
            2 * self.col + quadrant.col_offset(),
        )
    }

    /// The four children at `child_level`, in NW, NE, SW, SE order.
    ///
    /// The order matches [`crate::coord::Region::subdivide_quad`], so
    /// `children[i]` covers `parent_region.subdivide_quad()[i]`.
    pub fn create_children(&self, child_level: &Level) -> [TileKey; 4] {
        Quadrant::ALL.map(|q| self.child(child_level, q))
    }

    /// The parent key at `parent_level`, or `None` for level-zero tiles.
    pub fn parent(&self, parent_level: &Level) -> Option<TileKey> {
        if self.level == 0 {
            return None;
        }
        Some(TileKey::for_level(
            parent_level,
            self.row.div_euclid(2),
            self.col.div_euclid(2),
        ))
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.cache_namespace, self.level, self.row, self.col
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelSetConfig;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality_and_hash() {
        let a = TileKey::new(3, 10, 20, "earth/bmng");
        let b = TileKey::new(3, 10, 20, String::from("earth/bmng"));
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&TileKey::new(3, 10, 20, "earth/other")));
    }

    #[test]
    fn test_children_row_col_doubling() {
        let levels = LevelSetConfig::new("bmng", "earth/bmng", "https://tiles.example.com")
            .build()
            .unwrap();
        let parent = TileKey::for_level(levels.level(2).unwrap(), 5, 7);
        let child_level = levels.level(3).unwrap();

        let [nw, ne, sw, se] = parent.create_children(child_level);
        assert_eq!((nw.row(), nw.col()), (11, 14));
        assert_eq!((ne.row(), ne.col()), (11, 15));
        assert_eq!((sw.row(), sw.col()), (10, 14));
        assert_eq!((se.row(), se.col()), (10, 15));
        assert!([&nw, &ne, &sw, &se].iter().all(|k| k.level() == 3));
        assert_eq!(nw.cache_namespace(), "earth/bmng");
    }

    #[test]
    fn test_parent_inverts_children() {
        let levels = LevelSetConfig::new("bmng", "earth/bmng", "https://tiles.example.com")
            .build()
            .unwrap();
        let parent = TileKey::for_level(levels.level(1).unwrap(), 3, 6);
        for child in parent.create_children(levels.level(2).unwrap()) {
            assert_eq!(child.parent(levels.level(1).unwrap()), Some(parent.clone()));
        }
        assert!(TileKey::new(0, 0, 0, "x").parent(levels.level(0).unwrap()).is_none());
    }

    #[test]
    fn test_display() {
        let key = TileKey::new(4, 12, 34, "earth/landsat");
        assert_eq!(key.to_string(), "earth/landsat/4/12/34");
    }
}
