//! CLI command implementations.
//!
//! - [`tiles`] - List the tiles covering a region
//! - [`fetch`] - Fetch one tile synchronously
//! - [`prefetch`] - Download every tile of a region
//! - [`cache`] - Cache management (stats, clear)

pub mod cache;
pub mod common;
pub mod fetch;
pub mod prefetch;
pub mod tiles;
