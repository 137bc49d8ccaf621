//! Tile identities.
//!
//! A tile is identified structurally by `(level, row, col, cache namespace)`.
//! Identities are rebuilt on every frame's enumeration, so equality and
//! hashing compare values, never object identity: an address built this frame
//! finds the cache entry stored under an address built frames ago.
//!
//! - [`TileKey`]: rectangular quadtree tile (4 children per subdivision).
//! - [`CurtainTileKey`]: path-following tile (2 children per subdivision).
//! - [`TileAddress`]: either of the above; the key type of the cache and the
//!   retrieval coordinator.

mod address;
mod curtain;
mod key;

pub use address::TileAddress;
pub use curtain::CurtainTileKey;
pub use key::TileKey;
