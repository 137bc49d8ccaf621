//! CLI error handling with user-friendly messages.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilepyramid::cache::CacheError;
use tilepyramid::config::ConfigError;
use tilepyramid::provider::FetchError;
use tilepyramid::retrieval::RetrievalError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Config file could not be loaded
    Config(ConfigError),
    /// No `[layer.<name>]` section with this name
    UnknownLayer { name: String, known: Vec<String> },
    /// Argument values that clap cannot check on its own
    InvalidArgs(String),
    /// Failed to build the async runtime
    Runtime(std::io::Error),
    /// Failed to create the HTTP client
    HttpClient(FetchError),
    Retrieval(RetrievalError),
    Cache(CacheError),
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::UnknownLayer { known, .. } = self {
            eprintln!();
            if known.is_empty() {
                eprintln!("No layers are configured. Add a [layer.<name>] section to config.ini.");
            } else {
                eprintln!("Configured layers: {}", known.join(", "));
            }
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::UnknownLayer { name, .. } => write!(f, "Unknown layer '{}'", name),
            CliError::InvalidArgs(msg) => write!(f, "{}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Retrieval(e) => write!(f, "Tile retrieval failed: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) | CliError::Runtime(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::HttpClient(e) => Some(e),
            CliError::Retrieval(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<RetrievalError> for CliError {
    fn from(e: RetrievalError) -> Self {
        CliError::Retrieval(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}
