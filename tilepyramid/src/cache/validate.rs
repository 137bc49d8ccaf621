//! Payload validation.
//!
//! A validator decides whether bytes read from disk or received from the
//! origin are a usable tile. The disk tier deletes files that fail
//! validation; the retrieval path discards the download.

use thiserror::Error;

use crate::level::Level;

/// Reasons a payload is rejected.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("payload is empty")]
    Empty,

    /// The payload could not be decoded.
    #[error("failed to decode payload: {0}")]
    Decode(String),

    /// The origin answered with a document instead of a tile.
    #[error("unexpected content type: {0}")]
    UnexpectedContentType(String),

    #[error("tile is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    Dimensions {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Re-encoding into the preferred format failed.
    #[error("failed to encode payload: {0}")]
    Encode(String),
}

/// Decides whether a payload is a usable tile for `level`.
pub trait PayloadValidator: Send + Sync {
    fn validate(&self, payload: &[u8], level: &Level) -> Result<(), ValidationError>;
}

/// Accepts any non-empty payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyValidator;

impl PayloadValidator for NonEmptyValidator {
    fn validate(&self, payload: &[u8], _level: &Level) -> Result<(), ValidationError> {
        if payload.is_empty() {
            return Err(ValidationError::Empty);
        }
        Ok(())
    }
}

/// Accepts payloads that decode as an image.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageValidator {
    check_dimensions: bool,
}

impl ImageValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require the decoded image to match the level's tile size.
    pub fn with_dimension_check(mut self) -> Self {
        self.check_dimensions = true;
        self
    }
}

impl PayloadValidator for ImageValidator {
    fn validate(&self, payload: &[u8], level: &Level) -> Result<(), ValidationError> {
        if payload.is_empty() {
            return Err(ValidationError::Empty);
        }
        let image =
            image::load_from_memory(payload).map_err(|e| ValidationError::Decode(e.to_string()))?;
        if self.check_dimensions {
            check_dimensions(image.width(), image.height(), level)?;
        }
        Ok(())
    }
}

pub(crate) fn check_dimensions(
    width: u32,
    height: u32,
    level: &Level,
) -> Result<(), ValidationError> {
    if width != level.tile_width() || height != level.tile_height() {
        return Err(ValidationError::Dimensions {
            expected_width: level.tile_width(),
            expected_height: level.tile_height(),
            actual_width: width,
            actual_height: height,
        });
    }
    Ok(())
}
