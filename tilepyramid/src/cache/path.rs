//! Disk tier path layout.

use std::path::{Path, PathBuf};

use crate::tile::TileAddress;

/// Directory holding every tile of `address`'s row.
fn row_dir(root: &Path, address: &TileAddress) -> PathBuf {
    root.join(address.cache_namespace())
        .join(address.level().to_string())
        .join(address.row().to_string())
}

/// `{root}/{namespace}/{level}/{row}/{stem}.{suffix}`
pub fn tile_path(root: &Path, address: &TileAddress, suffix: &str) -> PathBuf {
    row_dir(root, address).join(format!("{}.{}", address.file_stem(), suffix))
}

/// `{root}/{namespace}/{level}/{row}/{stem}.{suffix}.absent`
pub fn absent_marker_path(root: &Path, address: &TileAddress, suffix: &str) -> PathBuf {
    row_dir(root, address).join(format!("{}.{}.absent", address.file_stem(), suffix))
}
