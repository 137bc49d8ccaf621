//! INI configuration.
//!
//! ```ini
//! [cache]
//! directory = ~/.cache/tilepyramid
//! memory_size = 512MB
//! absent_recheck_secs = 86400
//!
//! [retrieval]
//! workers = 8
//! queue_capacity = 1024
//! timeout_secs = 30
//! proxy_from = https://tiles.example.com
//! proxy_to = http://localhost:8080
//!
//! [layer.bmng]
//! dataset = bmng
//! cache_namespace = earth/bmng
//! service = https://tiles.example.com
//! format_suffix = jpg
//! num_levels = 5
//! level_zero_delta_lat = 36
//! level_zero_delta_lon = 36
//! ```
//!
//! Every key is optional except a layer's `dataset` and `service`. Values
//! are validated at load time; unknown keys are ignored.

mod file;
mod layer;
mod parser;
mod size;

pub use file::{config_file_path, ConfigError, ConfigFile};
pub use layer::{LayerConfig, UrlKind};
pub use size::{format_size, parse_size, SizeParseError};
