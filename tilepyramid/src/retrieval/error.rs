//! Retrieval errors.

use thiserror::Error;

use crate::cache::{CacheError, ValidationError};
use crate::provider::{FetchError, UrlError};

/// Why a synchronous request produced no tile.
///
/// Clone so one outcome can be delivered to every coalesced waiter.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The origin reported that the tile does not exist.
    #[error("tile {0} is absent at the origin")]
    Absent(String),

    /// Empty levels are never fetched.
    #[error("level {level} of {namespace} is empty")]
    EmptyLevel { namespace: String, level: u32 },

    /// The coordinator was started outside a tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,

    #[error("retrieval coordinator is shutting down")]
    ShuttingDown,
}

impl RetrievalError {
    /// True for failures worth retrying on a later request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RetrievalError::Fetch(_) | RetrievalError::Cache(_) | RetrievalError::ShuttingDown
        )
    }
}
