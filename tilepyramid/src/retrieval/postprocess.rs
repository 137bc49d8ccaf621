//! Post-processing of downloaded payloads.
//!
//! A post-processor validates a response body before it is promoted into
//! the cache and may transcode it to the preferred on-disk format. It runs
//! on the blocking pool.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat};

use crate::cache::ValidationError;
use crate::level::Level;

/// Turns a response body into the payload stored in the cache.
pub trait PostProcessor: Send + Sync {
    fn process(
        &self,
        body: Bytes,
        content_type: Option<&str>,
        level: &Level,
    ) -> Result<Bytes, ValidationError>;
}

/// Rejects error documents served in place of a tile.
///
/// Origins commonly answer a bad tile request with `200 OK` and an HTML or
/// XML error page; such bodies must never reach the cache.
pub fn check_content_type(content_type: Option<&str>) -> Result<(), ValidationError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };
    let lower = content_type.to_ascii_lowercase();
    if lower.starts_with("text/") || lower.contains("html") || lower.contains("xml") {
        return Err(ValidationError::UnexpectedContentType(
            content_type.to_string(),
        ));
    }
    Ok(())
}

/// Stores the body unchanged after the content-type guard.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl PostProcessor for PassThrough {
    fn process(
        &self,
        body: Bytes,
        content_type: Option<&str>,
        _level: &Level,
    ) -> Result<Bytes, ValidationError> {
        check_content_type(content_type)?;
        if body.is_empty() {
            return Err(ValidationError::Empty);
        }
        Ok(body)
    }
}

/// Decodes the body as an image and optionally transcodes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePostProcessor {
    preferred_format: Option<ImageFormat>,
    check_dimensions: bool,
}

impl ImagePostProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-encodes payloads that are not already in `format`.
    pub fn with_preferred_format(mut self, format: ImageFormat) -> Self {
        self.preferred_format = Some(format);
        self
    }

    /// Re-encodes into the format named by `extension` (`png`, `jpg`, ...).
    ///
    /// Returns `None` for extensions the image codecs do not know.
    pub fn with_preferred_extension(self, extension: &str) -> Option<Self> {
        ImageFormat::from_extension(extension.trim_start_matches('.'))
            .map(|format| self.with_preferred_format(format))
    }

    /// Requires decoded images to match the level's tile size.
    pub fn with_dimension_check(mut self) -> Self {
        self.check_dimensions = true;
        self
    }
}

impl PostProcessor for ImagePostProcessor {
    fn process(
        &self,
        body: Bytes,
        content_type: Option<&str>,
        level: &Level,
    ) -> Result<Bytes, ValidationError> {
        check_content_type(content_type)?;
        if body.is_empty() {
            return Err(ValidationError::Empty);
        }

        let source_format = image::guess_format(&body).ok();
        let image =
            image::load_from_memory(&body).map_err(|e| ValidationError::Decode(e.to_string()))?;

        if self.check_dimensions {
            crate::cache::check_dimensions(image.width(), image.height(), level)?;
        }

        match self.preferred_format {
            Some(target) if source_format != Some(target) => encode(image, target),
            _ => Ok(body),
        }
    }
}

fn encode(image: DynamicImage, format: ImageFormat) -> Result<Bytes, ValidationError> {
    // JPEG has no alpha channel.
    let image = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, format)
        .map_err(|e| ValidationError::Encode(e.to_string()))?;
    Ok(Bytes::from(out.into_inner()))
}
