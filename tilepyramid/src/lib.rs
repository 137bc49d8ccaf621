//! Tilepyramid - multi-resolution tile addressing, retrieval and caching
//!
//! This library answers the questions a virtual globe asks every frame:
//! which tiles cover the view at the resolution I need, which of them are
//! already in memory, and which have to be loaded from disk or downloaded.
//!
//! # Layout
//!
//! - [`coord`]: geographic regions and curtain path segments
//! - [`level`]: level sets and level selection
//! - [`tile`]: tile keys and cache addresses
//! - [`provider`]: URL builders and the HTTP client seam
//! - [`cache`]: the memory and disk tiers
//! - [`retrieval`]: the worker pool that fetches missing tiles
//! - [`layer`]: a per-dataset facade over all of the above
//! - [`config`]: INI configuration
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilepyramid::cache::{CacheConfig, CacheStore};
//! use tilepyramid::config::ConfigFile;
//! use tilepyramid::coord::Region;
//! use tilepyramid::layer::{FetchMode, TileLayer};
//! use tilepyramid::provider::ReqwestClient;
//! use tilepyramid::retrieval::RetrievalCoordinator;
//!
//! let config = ConfigFile::load()?;
//! let cache = Arc::new(CacheStore::new(&config.cache));
//! let client = Arc::new(ReqwestClient::with_timeout(config.retrieval.timeout)?);
//! let coordinator = Arc::new(RetrievalCoordinator::start(cache, client, config.retrieval.clone())?);
//!
//! let layer_config = config.layer("bmng").unwrap();
//! let layer = TileLayer::new(
//!     "bmng",
//!     layer_config.build_levels()?,
//!     layer_config.tile_source()?,
//!     coordinator,
//! );
//!
//! let view = Region::from_degrees(-10.0, 10.0, -10.0, 10.0);
//! let (_, tiles) = layer.tiles_for_view(&view, 9.0);
//! for key in tiles {
//!     let status = layer.resolve(&key, FetchMode::Async).await?;
//! }
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod layer;
pub mod level;
pub mod logging;
pub mod provider;
pub mod retrieval;
pub mod tile;

/// Version of the library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
