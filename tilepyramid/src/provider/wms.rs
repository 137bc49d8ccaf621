//! OGC WMS GetMap locators.

use super::types::UrlError;
use super::url::{check_address, UrlBuilder};
use crate::level::Level;
use crate::tile::TileAddress;

/// Builds WMS 1.3.0 GetMap requests with one BBOX per tile.
///
/// The level's service is the WMS endpoint and its dataset name is the
/// layer list. With `EPSG:4326` the 1.3.0 axis order is latitude first.
#[derive(Debug, Clone)]
pub struct WmsUrlBuilder {
    styles: String,
    transparent: bool,
}

impl WmsUrlBuilder {
    pub fn new() -> Self {
        Self {
            styles: String::new(),
            transparent: false,
        }
    }

    pub fn with_styles(mut self, styles: impl Into<String>) -> Self {
        self.styles = styles.into();
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }
}

impl Default for WmsUrlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn mime_type(format: &str) -> String {
    match format.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "tif" | "tiff" => "image/tiff".to_string(),
        "bil" => "application/bil16".to_string(),
        other => format!("image/{}", other),
    }
}

impl UrlBuilder for WmsUrlBuilder {
    fn build(
        &self,
        address: &TileAddress,
        level: &Level,
        format_override: Option<&str>,
    ) -> Result<String, UrlError> {
        if let TileAddress::Curtain(_) = address {
            return Err(UrlError::InvalidAddress(format!(
                "{} is a curtain tile; WMS serves rectangular tiles only",
                address
            )));
        }
        check_address(address, level)?;

        let (min_lat, max_lat, min_lon, max_lon) = level
            .tile_bounds(address.row(), address.col())
            .ok_or_else(|| UrlError::InvalidAddress(format!("{} has no bounds", address)))?;

        let format = format_override
            .unwrap_or_else(|| level.format_suffix())
            .trim_start_matches('.');
        let service = level.service();
        let separator = if service.contains('?') { '&' } else { '?' };

        Ok(format!(
            "{service}{separator}SERVICE=WMS&REQUEST=GetMap&VERSION=1.3.0\
             &LAYERS={layers}&STYLES={styles}&CRS=EPSG:4326\
             &BBOX={min_lat},{min_lon},{max_lat},{max_lon}\
             &WIDTH={width}&HEIGHT={height}&FORMAT={format}&TRANSPARENT={transparent}",
            layers = level.dataset_name(),
            styles = self.styles,
            width = level.tile_width(),
            height = level.tile_height(),
            format = mime_type(format),
            transparent = if self.transparent { "TRUE" } else { "FALSE" },
        ))
    }
}
