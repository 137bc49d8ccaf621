//! Per-dataset configuration.

use std::sync::Arc;

use super::file::ConfigError;
use crate::level::{LevelSet, LevelSetConfig};
use crate::provider::{TemplateUrlBuilder, UrlBuilder, WmsUrlBuilder};
use crate::retrieval::{ImagePostProcessor, PassThrough, PostProcessor, TileSource};

/// How a layer's locators are built.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlKind {
    /// Placeholder template; see [`TemplateUrlBuilder`].
    Template(String),
    /// OGC WMS GetMap against the layer's service.
    Wms,
}

/// One `[layer.<name>]` section.
#[derive(Debug, Clone)]
pub struct LayerConfig {
    pub name: String,
    pub levels: LevelSetConfig,
    pub url: UrlKind,
    /// On-disk format; payloads in any other format are transcoded.
    pub preferred_format: Option<String>,
    /// Format requested from the origin when it differs from the on-disk one.
    pub remote_format: Option<String>,
}

impl LayerConfig {
    pub fn build_levels(&self) -> Result<LevelSet, ConfigError> {
        self.levels
            .clone()
            .build()
            .map_err(|source| ConfigError::LevelSet {
                layer: self.name.clone(),
                source,
            })
    }

    pub fn url_builder(&self) -> Arc<dyn UrlBuilder> {
        match &self.url {
            UrlKind::Template(template) => Arc::new(TemplateUrlBuilder::new(template.clone())),
            UrlKind::Wms => Arc::new(WmsUrlBuilder::new()),
        }
    }

    /// URL builder plus the post-processor implied by `preferred_format`.
    pub fn tile_source(&self) -> Result<TileSource, ConfigError> {
        let post_processor: Arc<dyn PostProcessor> = match &self.preferred_format {
            Some(format) => Arc::new(
                ImagePostProcessor::new()
                    .with_preferred_extension(format)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        section: format!("layer.{}", self.name),
                        key: "preferred_format".to_string(),
                        value: format.clone(),
                        reason: "not a known image format".to_string(),
                    })?,
            ),
            None => Arc::new(PassThrough),
        };

        let mut source = TileSource::new(self.url_builder()).with_post_processor(post_processor);
        if let Some(remote) = &self.remote_format {
            source = source.with_format_override(remote.clone());
        }
        Ok(source)
    }
}
