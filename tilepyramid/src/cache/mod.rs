//! Two-tier tile cache.
//!
//! [`CacheStore`] fronts a bounded in-memory tier ([`MemoryTier`]) with an
//! on-disk file store ([`DiskTier`]). Lookups are consulted in that order:
//!
//! ```text
//! get(address)            memory only, never blocks
//! lookup_on_disk(address) disk read on the blocking pool, promotes to memory
//! promote(address, bytes) atomic disk write, then memory insert
//! ```
//!
//! # Disk layout
//!
//! ```text
//! {root}/{cache_namespace}/{level}/{row}/{row}_{col}.{suffix}
//! {root}/{cache_namespace}/{level}/{row}/{row}_{col}.{suffix}.absent
//! ```
//!
//! The `.absent` marker records that the origin reported the tile as not
//! existing, which is distinct from "not yet fetched".
//!
//! # Consistency
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! concurrent reader sees either nothing or a complete file. The memory tier
//! is only updated after the rename succeeds.

mod config;
mod disk;
mod locks;
mod memory;
mod path;
mod store;
mod types;
mod validate;

pub use config::{default_cache_dir, CacheConfig, DEFAULT_ABSENT_RECHECK, DEFAULT_MEMORY_SIZE};
pub use disk::{DiskFile, DiskLookup, DiskStats, DiskTier};
pub use locks::NamespaceLocks;
pub use memory::MemoryTier;
pub use path::{absent_marker_path, tile_path};
pub use store::CacheStore;
pub use types::{CacheEntry, CacheError};
pub use validate::{ImageValidator, NonEmptyValidator, PayloadValidator, ValidationError};

pub(crate) use validate::check_dimensions;

#[cfg(test)]
pub(crate) use validate::tests::png_bytes;
