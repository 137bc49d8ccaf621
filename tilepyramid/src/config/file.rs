//! Config file loading.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::layer::LayerConfig;
use crate::cache::CacheConfig;
use crate::level::LevelSetError;
use crate::retrieval::RetrievalConfig;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or is not valid INI.
    #[error("failed to read config file: {0}")]
    Read(#[from] ini::Error),

    #[error("invalid configuration: {section}.{key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("missing configuration key: {section}.{key}")]
    MissingKey { section: String, key: String },

    /// A layer's level set failed validation.
    #[error("layer {layer}: {source}")]
    LevelSet {
        layer: String,
        #[source]
        source: LevelSetError,
    },
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub cache: CacheConfig,
    pub retrieval: RetrievalConfig,
    pub layers: Vec<LayerConfig>,
}

impl ConfigFile {
    /// Loads the default config file, or defaults when it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parses configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read(ini::Error::Parse(e)))?;
        super::parser::parse_ini(&ini)
    }

    pub fn layer(&self, name: &str) -> Option<&LayerConfig> {
        self.layers.iter().find(|layer| layer.name == name)
    }
}

/// `{config_dir}/tilepyramid/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilepyramid")
        .join("config.ini")
}
