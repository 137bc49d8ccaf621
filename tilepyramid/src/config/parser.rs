//! Maps INI sections to typed configuration.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use ini::{Ini, Properties};

use super::file::{ConfigError, ConfigFile};
use super::layer::{LayerConfig, UrlKind};
use super::size::parse_size;
use crate::coord::Region;
use crate::level::LevelSetConfig;
use crate::provider::DEFAULT_TEMPLATE;

const LAYER_PREFIX: &str = "layer.";

/// Overlays the values found in `ini` on `ConfigFile::default()`.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigError> {
    let mut config = ConfigFile::default();

    // [cache]
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section, "directory") {
            config.cache.directory = expand_tilde(v);
        }
        if let Some(v) = section.get("memory_size") {
            config.cache.memory_size = parse_size(v).map_err(|e| ConfigError::InvalidValue {
                section: "cache".to_string(),
                key: "memory_size".to_string(),
                value: v.to_string(),
                reason: e.to_string(),
            })?;
        }
        if let Some(secs) = parse_number::<u64>(section, "cache", "absent_recheck_secs")? {
            config.cache.absent_recheck = Duration::from_secs(secs);
        }
    }

    // [retrieval]
    if let Some(section) = ini.section(Some("retrieval")) {
        if let Some(workers) = parse_number::<usize>(section, "retrieval", "workers")? {
            config.retrieval.workers = positive(workers, "retrieval", "workers")?;
        }
        if let Some(capacity) = parse_number::<usize>(section, "retrieval", "queue_capacity")? {
            config.retrieval.queue_capacity = positive(capacity, "retrieval", "queue_capacity")?;
        }
        if let Some(secs) = parse_number::<u64>(section, "retrieval", "timeout_secs")? {
            config.retrieval.timeout =
                Duration::from_secs(positive(secs, "retrieval", "timeout_secs")?);
        }
        match (non_empty(section, "proxy_from"), non_empty(section, "proxy_to")) {
            (Some(from), Some(to)) => {
                config.retrieval.proxy = Some((from.to_string(), to.to_string()));
            }
            (None, None) => {}
            (Some(_), None) => return Err(missing("retrieval", "proxy_to")),
            (None, Some(_)) => return Err(missing("retrieval", "proxy_from")),
        }
    }

    // [layer.<name>]
    for (name, section) in ini.iter() {
        let Some(layer_name) = name.and_then(|n| n.strip_prefix(LAYER_PREFIX)) else {
            continue;
        };
        config.layers.push(parse_layer(layer_name, section)?);
    }

    Ok(config)
}

fn parse_layer(name: &str, section: &Properties) -> Result<LayerConfig, ConfigError> {
    let section_name = format!("{}{}", LAYER_PREFIX, name);
    let s = section_name.as_str();

    let dataset = non_empty(section, "dataset").ok_or_else(|| missing(s, "dataset"))?;
    let service = non_empty(section, "service").ok_or_else(|| missing(s, "service"))?;
    let namespace = non_empty(section, "cache_namespace").unwrap_or(dataset);

    let mut levels = LevelSetConfig::new(dataset, namespace, service);

    if let Some(v) = non_empty(section, "format_suffix") {
        levels = levels.with_format_suffix(v);
    }
    let width = parse_number::<u32>(section, s, "tile_width")?;
    let height = parse_number::<u32>(section, s, "tile_height")?;
    if width.is_some() || height.is_some() {
        let width = width.unwrap_or(levels.tile_width);
        let height = height.unwrap_or(levels.tile_height);
        levels = levels.with_tile_size(width, height);
    }
    if let Some(n) = parse_number::<u32>(section, s, "num_levels")? {
        levels = levels.with_num_levels(n);
    }
    if let Some(n) = parse_number::<u32>(section, s, "num_empty_levels")? {
        levels = levels.with_num_empty_levels(n);
    }

    let delta_lat = parse_number::<f64>(section, s, "level_zero_delta_lat")?;
    let delta_lon = parse_number::<f64>(section, s, "level_zero_delta_lon")?;
    if delta_lat.is_some() || delta_lon.is_some() {
        let delta_lat = delta_lat.unwrap_or(levels.level_zero_delta_lat);
        let delta_lon = delta_lon.unwrap_or(levels.level_zero_delta_lon);
        levels = levels.with_level_zero_delta(delta_lat, delta_lon);
    }

    let full = Region::full_sphere();
    let bounds = [
        parse_number::<f64>(section, s, "min_lat")?,
        parse_number::<f64>(section, s, "max_lat")?,
        parse_number::<f64>(section, s, "min_lon")?,
        parse_number::<f64>(section, s, "max_lon")?,
    ];
    if bounds.iter().any(Option::is_some) {
        levels = levels.with_sector(Region::from_degrees(
            bounds[0].unwrap_or(full.min_lat),
            bounds[1].unwrap_or(full.max_lat),
            bounds[2].unwrap_or(full.min_lon),
            bounds[3].unwrap_or(full.max_lon),
        ));
    }

    if let Some(v) = non_empty(section, "expiry") {
        levels = levels.with_expiry(parse_rfc3339(v).ok_or_else(|| ConfigError::InvalidValue {
            section: section_name.clone(),
            key: "expiry".to_string(),
            value: v.to_string(),
            reason: "expected an RFC 3339 timestamp like 2024-01-01T00:00:00Z".to_string(),
        })?);
    }

    let url_kind = non_empty(section, "url_kind").map(str::to_ascii_lowercase);
    let url = match url_kind.as_deref() {
        None | Some("template") => UrlKind::Template(
            non_empty(section, "url_template")
                .unwrap_or(DEFAULT_TEMPLATE)
                .to_string(),
        ),
        Some("wms") => UrlKind::Wms,
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                section: section_name.clone(),
                key: "url_kind".to_string(),
                value: other.to_string(),
                reason: "must be 'template' or 'wms'".to_string(),
            })
        }
    };

    // A preferred format becomes the on-disk suffix; the origin is still
    // asked for the configured one.
    let mut remote_format = None;
    let preferred_format = non_empty(section, "preferred_format")
        .map(|v| v.trim_start_matches('.').to_ascii_lowercase());
    if let Some(preferred) = &preferred_format {
        if *preferred != levels.format_suffix {
            remote_format = Some(levels.format_suffix.clone());
            levels = levels.with_format_suffix(preferred.clone());
        }
    }

    Ok(LayerConfig {
        name: name.to_string(),
        levels,
        url,
        preferred_format,
        remote_format,
    })
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let Some(v) = non_empty(section, key) else {
        return Ok(None);
    };
    v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
        section: section_name.to_string(),
        key: key.to_string(),
        value: v.to_string(),
        reason: "expected a number".to_string(),
    })
}

fn positive<T: PartialOrd + Default + ToString>(
    value: T,
    section: &str,
    key: &str,
) -> Result<T, ConfigError> {
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn missing(section: &str, key: &str) -> ConfigError {
    ConfigError::MissingKey {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn parse_rfc3339(value: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| SystemTime::from(dt.with_timezone(&chrono::Utc)))
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
