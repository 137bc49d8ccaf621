//! Resource locator construction.
//!
//! Builders are pure: the same address and level always produce the same
//! locator and no I/O is performed, so a single builder is shared by every
//! worker without synchronization.

use std::sync::Arc;

use super::types::UrlError;
use crate::level::{Level, TileDelta};
use crate::tile::TileAddress;

/// Default template: `{service}/{dataset}/{level}/{row}/{row}_{col}.{format}`.
pub const DEFAULT_TEMPLATE: &str = "{service}/{dataset}/{level}/{row}/{row}_{col}.{format}";

/// Maps a tile address to a remote resource locator.
pub trait UrlBuilder: Send + Sync {
    /// Builds the locator for `address` on `level`.
    ///
    /// `format_override` replaces the level's format suffix.
    fn build(
        &self,
        address: &TileAddress,
        level: &Level,
        format_override: Option<&str>,
    ) -> Result<String, UrlError>;
}

impl<T: UrlBuilder + ?Sized> UrlBuilder for Arc<T> {
    fn build(
        &self,
        address: &TileAddress,
        level: &Level,
        format_override: Option<&str>,
    ) -> Result<String, UrlError> {
        (**self).build(address, level, format_override)
    }
}

/// Checks that `address` belongs to `level` and can be requested.
pub(crate) fn check_address(address: &TileAddress, level: &Level) -> Result<(), UrlError> {
    if address.level() != level.number() {
        return Err(UrlError::InvalidAddress(format!(
            "{} is not on level {}",
            address,
            level.number()
        )));
    }
    if address.cache_namespace() != level.cache_namespace() {
        return Err(UrlError::InvalidAddress(format!(
            "{} is not in namespace {}",
            address,
            level.cache_namespace()
        )));
    }
    if level.is_empty() {
        return Err(UrlError::InvalidAddress(format!(
            "level {} of {} is empty",
            level.number(),
            level.cache_namespace()
        )));
    }
    if address.row() < 0 || address.col() < 0 {
        return Err(UrlError::InvalidAddress(format!(
            "{} has a negative index",
            address
        )));
    }
    let kind_matches = matches!(
        (address, level.delta()),
        (TileAddress::Rect(_), TileDelta::Angular { .. })
            | (TileAddress::Curtain(_), TileDelta::Path { .. })
    );
    if !kind_matches {
        return Err(UrlError::InvalidAddress(format!(
            "{} does not match the tiling of level {}",
            address,
            level.number()
        )));
    }
    Ok(())
}

fn resolve_format<'a>(level: &'a Level, format_override: Option<&'a str>) -> &'a str {
    format_override
        .unwrap_or_else(|| level.format_suffix())
        .trim_start_matches('.')
}

/// Placeholder substitution.
///
/// Recognized placeholders: `{service}`, `{dataset}`, `{level}`, `{row}`,
/// `{col}`, `{format}` and, for curtain tiles only, `{segment}`.
#[derive(Debug, Clone)]
pub struct TemplateUrlBuilder {
    template: String,
}

impl TemplateUrlBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl Default for TemplateUrlBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl UrlBuilder for TemplateUrlBuilder {
    fn build(
        &self,
        address: &TileAddress,
        level: &Level,
        format_override: Option<&str>,
    ) -> Result<String, UrlError> {
        check_address(address, level)?;

        let mut url = self
            .template
            .replace("{service}", level.service().trim_end_matches('/'))
            .replace("{dataset}", level.dataset_name())
            .replace("{level}", &address.level().to_string())
            .replace("{row}", &address.row().to_string())
            .replace("{col}", &address.col().to_string())
            .replace("{format}", resolve_format(level, format_override));

        if url.contains("{segment}") {
            match address {
                TileAddress::Curtain(key) => {
                    url = url.replace("{segment}", &key.segment_index().to_string());
                }
                TileAddress::Rect(_) => {
                    return Err(UrlError::InvalidAddress(format!(
                        "{} has no path segment",
                        address
                    )));
                }
            }
        }
        Ok(url)
    }
}

/// Rewrites locators that start with `from` to start with `to`.
#[derive(Debug, Clone)]
pub struct ProxiedUrlBuilder<B> {
    inner: B,
    from: String,
    to: String,
}

impl<B: UrlBuilder> ProxiedUrlBuilder<B> {
    pub fn new(inner: B, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            inner,
            from: from.into(),
            to: to.into(),
        }
    }
}

impl<B: UrlBuilder> UrlBuilder for ProxiedUrlBuilder<B> {
    fn build(
        &self,
        address: &TileAddress,
        level: &Level,
        format_override: Option<&str>,
    ) -> Result<String, UrlError> {
        let url = self.inner.build(address, level, format_override)?;
        match url.strip_prefix(self.from.as_str()) {
            Some(rest) if !self.from.is_empty() => Ok(format!("{}{}", self.to, rest)),
            _ => Ok(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::PathSegment;
    use crate::level::{CurtainLevelSetConfig, LevelSet, LevelSetConfig};
    use crate::tile::{CurtainTileKey, TileKey};

    fn levels() -> LevelSet {
        LevelSetConfig::new("bmng", "earth/bmng", "https://tiles.example.com/")
            .with_num_empty_levels(1)
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_template() {
        let levels = levels();
        let level = levels.level(2).unwrap();
        let url = TemplateUrlBuilder::default()
            .build(&TileKey::for_level(level, 8, 18).into(), level, None)
            .unwrap();
        assert_eq!(url, "https://tiles.example.com/bmng/2/8/8_18.jpg");
    }

    #[test]
    fn test_format_override() {
        let levels = levels();
        let level = levels.level(2).unwrap();
        let url = TemplateUrlBuilder::default()
            .build(&TileKey::for_level(level, 8, 18).into(), level, Some(".png"))
            .unwrap();
        assert!(url.ends_with("8_18.png"));
    }

    #[test]
    fn test_custom_template() {
        let levels = levels();
        let level = levels.level(3).unwrap();
        let builder = TemplateUrlBuilder::new("{service}?T={dataset}&L={level}&X={col}&Y={row}");
        let url = builder
            .build(&TileKey::for_level(level, 1, 2).into(), level, None)
            .unwrap();
        assert_eq!(url, "https://tiles.example.com?T=bmng&L=3&X=2&Y=1");
    }

    #[test]
    fn test_build_is_deterministic() {
        let levels = levels();
        let level = levels.level(2).unwrap();
        let address: TileAddress = TileKey::for_level(level, 3, 4).into();
        let builder = TemplateUrlBuilder::default();
        assert_eq!(
            builder.build(&address, level, None),
            builder.build(&address, level, None)
        );
    }

    #[test]
    fn test_rejects_mismatched_level() {
        let levels = levels();
        let address: TileAddress = TileKey::for_level(levels.level(2).unwrap(), 0, 0).into();
        let result = TemplateUrlBuilder::default().build(&address, levels.level(3).unwrap(), None);
        assert!(matches!(result, Err(UrlError::InvalidAddress(_))));
    }

    #[test]
    fn test_rejects_empty_level() {
        let levels = levels();
        let level = levels.level(0).unwrap();
        let result =
            TemplateUrlBuilder::default().build(&TileKey::for_level(level, 0, 0).into(), level, None);
        assert!(matches!(result, Err(UrlError::InvalidAddress(_))));
    }

    #[test]
    fn test_rejects_negative_index() {
        let levels = levels();
        let level = levels.level(1).unwrap();
        let result = TemplateUrlBuilder::default().build(
            &TileKey::for_level(level, -1, 0).into(),
            level,
            None,
        );
        assert!(matches!(result, Err(UrlError::InvalidAddress(_))));
    }

    #[test]
    fn test_segment_placeholder() {
        let curtain = CurtainLevelSetConfig::new("radar", "curtain/radar", "https://c.example.com")
            .build()
            .unwrap();
        let level = curtain.level(1).unwrap();
        let address: TileAddress =
            CurtainTileKey::for_level(level, 0, 1, 7, PathSegment::FULL).into();
        let builder = TemplateUrlBuilder::new("{service}/{dataset}/{segment}/{level}/{col}.{format}");
        assert_eq!(
            builder.build(&address, level, None).unwrap(),
            "https://c.example.com/radar/7/1/1.png"
        );

        let levels = levels();
        let rect = levels.level(1).unwrap();
        assert!(builder
            .build(&TileKey::for_level(rect, 0, 0).into(), rect, None)
            .is_err());
    }

    #[test]
    fn test_proxy_rewrites_prefix() {
        let levels = levels();
        let level = levels.level(2).unwrap();
        let builder = ProxiedUrlBuilder::new(
            TemplateUrlBuilder::default(),
            "https://tiles.example.com",
            "http://localhost:8080/proxy",
        );
        let url = builder
            .build(&TileKey::for_level(level, 8, 18).into(), level, None)
            .unwrap();
        assert_eq!(url, "http://localhost:8080/proxy/bmng/2/8/8_18.jpg");
    }

    #[test]
    fn test_proxy_leaves_other_hosts() {
        let levels = levels();
        let level = levels.level(2).unwrap();
        let builder = ProxiedUrlBuilder::new(
            TemplateUrlBuilder::default(),
            "https://elsewhere.example.com",
            "http://localhost",
        );
        let url = builder
            .build(&TileKey::for_level(level, 8, 18).into(), level, None)
            .unwrap();
        assert!(url.starts_with("https://tiles.example.com"));
    }
}
