//! Types and helpers shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use tilepyramid::cache::CacheStore;
use tilepyramid::config::{ConfigFile, LayerConfig};
use tilepyramid::coord::Region;
use tilepyramid::layer::TileLayer;
use tilepyramid::provider::ReqwestClient;
use tilepyramid::retrieval::RetrievalCoordinator;

use crate::error::CliError;

/// Geographic bounds given on the command line.
#[derive(Debug, Clone, Args)]
pub struct RegionArgs {
    /// Southern edge in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub min_lat: f64,
    /// Northern edge in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub max_lat: f64,
    /// Western edge in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub min_lon: f64,
    /// Eastern edge in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub max_lon: f64,
}

impl RegionArgs {
    pub fn region(&self) -> Result<Region, CliError> {
        let values = [self.min_lat, self.max_lat, self.min_lon, self.max_lon];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CliError::InvalidArgs(
                "region bounds must be finite numbers".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.min_lat) || !(-90.0..=90.0).contains(&self.max_lat) {
            return Err(CliError::InvalidArgs(
                "latitudes must be between -90 and 90".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&self.min_lon) || !(-180.0..=180.0).contains(&self.max_lon)
        {
            return Err(CliError::InvalidArgs(
                "longitudes must be between -180 and 180".to_string(),
            ));
        }
        Ok(Region::from_degrees(
            self.min_lat,
            self.max_lat,
            self.min_lon,
            self.max_lon,
        ))
    }
}

/// Loads `path` if given, otherwise the default config file.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

pub fn find_layer<'a>(config: &'a ConfigFile, name: &str) -> Result<&'a LayerConfig, CliError> {
    config
        .layer(name)
        .ok_or_else(|| CliError::UnknownLayer {
            name: name.to_string(),
            known: config.layers.iter().map(|l| l.name.clone()).collect(),
        })
}

/// Starts a coordinator over the configured cache. Must run inside a runtime.
pub fn start_coordinator(config: &ConfigFile) -> Result<Arc<RetrievalCoordinator>, CliError> {
    let cache = Arc::new(CacheStore::new(&config.cache));
    let client =
        ReqwestClient::with_timeout(config.retrieval.timeout).map_err(CliError::HttpClient)?;
    let coordinator =
        RetrievalCoordinator::start(cache, Arc::new(client), config.retrieval.clone())?;
    Ok(Arc::new(coordinator))
}

/// Builds a layer whose locators pass through the configured proxy.
pub fn build_layer(
    layer: &LayerConfig,
    coordinator: Arc<RetrievalCoordinator>,
) -> Result<TileLayer, CliError> {
    let levels = layer.build_levels()?;
    let mut source = layer.tile_source()?;
    source.url_builder = coordinator.proxied(source.url_builder);
    Ok(TileLayer::new(layer.name.clone(), levels, source, coordinator))
}

pub fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}
