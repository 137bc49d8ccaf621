//! Provider error types.

use thiserror::Error;

/// A tile address cannot be expressed as a resource locator.
///
/// This is a programmer error and is never retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UrlError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Transport-level failures while fetching a tile.
///
/// These are retried only when the tile is requested again.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// The origin answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The request timed out.
    #[error("request to {0} timed out")]
    Timeout(String),

    /// Connection or body read failure.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}
