//! Unified tile address used as the cache and retrieval key.

use std::fmt;

use super::{CurtainTileKey, TileKey};

/// Address of any tile the cache can hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TileAddress {
    Rect(TileKey),
    Curtain(CurtainTileKey),
}

impl TileAddress {
    pub fn level(&self) -> u32 {
        match self {
            TileAddress::Rect(k) => k.level(),
            TileAddress::Curtain(k) => k.level(),
        }
    }

    pub fn row(&self) -> i32 {
        match self {
            TileAddress::Rect(k) => k.row(),
            TileAddress::Curtain(k) => k.row(),
        }
    }

    pub fn col(&self) -> i32 {
        match self {
            TileAddress::Rect(k) => k.col(),
            TileAddress::Curtain(k) => k.col(),
        }
    }

    pub fn cache_namespace(&self) -> &str {
        match self {
            TileAddress::Rect(k) => k.cache_namespace(),
            TileAddress::Curtain(k) => k.cache_namespace(),
        }
    }

    /// File name stem within `{namespace}/{level}/{row}/`.
    ///
    /// Rectangular tiles use `{row}_{col}`; curtain tiles append the path
    /// segment index so several paths can share one namespace.
    pub fn file_stem(&self) -> String {
        match self {
            TileAddress::Rect(k) => format!("{}_{}", k.row(), k.col()),
            TileAddress::Curtain(k) => {
                format!("{}_{}_s{}", k.row(), k.col(), k.segment_index())
            }
        }
    }
}

impl From<TileKey> for TileAddress {
    fn from(key: TileKey) -> Self {
        TileAddress::Rect(key)
    }
}

impl From<CurtainTileKey> for TileAddress {
    fn from(key: CurtainTileKey) -> Self {
        TileAddress::Curtain(key)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileAddress::Rect(k) => k.fmt(f),
            TileAddress::Curtain(k) => k.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::PathSegment;

    #[test]
    fn test_accessors_delegate() {
        let addr: TileAddress = TileKey::new(5, 17, 33, "earth/ned").into();
        assert_eq!(addr.level(), 5);
        assert_eq!(addr.row(), 17);
        assert_eq!(addr.col(), 33);
        assert_eq!(addr.cache_namespace(), "earth/ned");
        assert_eq!(addr.file_stem(), "17_33");
    }

    #[test]
    fn test_curtain_file_stem_includes_segment() {
        let addr: TileAddress =
            CurtainTileKey::new(1, 0, 1, "curtain", 4, PathSegment::FULL).into();
        assert_eq!(addr.file_stem(), "0_1_s4");
    }

    #[test]
    fn test_rect_and_curtain_never_equal() {
        let rect: TileAddress = TileKey::new(1, 0, 1, "ns").into();
        let curtain: TileAddress = CurtainTileKey::new(1, 0, 1, "ns", 0, PathSegment::FULL).into();
        assert_ne!(rect, curtain);
    }
}
