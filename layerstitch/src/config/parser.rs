//! INI parsing: `Ini` → `ConfigFile`.
//!
//! The single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::color::BackgroundColor;
use crate::executor::clamp_workers;
use crate::pipeline::{MAX_GRID_SIZE, MAX_PREVIEW_TILE_SIZE, MAX_TRIM_PIXELS};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [assembly] section
    if let Some(section) = ini.section(Some("assembly")) {
        if let Some(v) = parse_ranged(section, "assembly", "grid_size", 1, MAX_GRID_SIZE)? {
            config.assembly.grid_size = v;
        }
        if let Some(v) = parse_ranged(section, "assembly", "trim_pixels", 0, MAX_TRIM_PIXELS)? {
            config.assembly.trim_pixels = v;
        }
        if let Some(v) = section.get("prefix") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("assembly", "prefix", v, "must not be empty"));
            }
            config.assembly.prefix = v.to_string();
        }
        if let Some(v) = section.get("background") {
            config.assembly.background = BackgroundColor::from_str(v).map_err(|_| {
                invalid(
                    "assembly",
                    "background",
                    v,
                    "expected #rrggbb, #rgb, or a color name",
                )
            })?;
        }
        if let Some(v) = parse_ranged(
            section,
            "assembly",
            "preview_tile_size",
            1,
            MAX_PREVIEW_TILE_SIZE,
        )? {
            config.assembly.preview_tile_size = v;
        }
    }

    // [converter] section
    if let Some(section) = ini.section(Some("converter")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            if !v.is_empty() {
                config.converter.path = Some(expand_tilde(v));
            }
        }
        if let Some(v) = section.get("timeout") {
            let timeout: u64 = v.trim().parse().map_err(|_| {
                invalid("converter", "timeout", v, "must be a positive integer (seconds)")
            })?;
            if timeout == 0 {
                return Err(invalid(
                    "converter",
                    "timeout",
                    v,
                    "must be a positive integer (seconds)",
                ));
            }
            config.converter.timeout = timeout;
        }
        if let Some(v) = section.get("source_extension") {
            config.converter.source_extension = parse_extension("source_extension", v)?;
        }
        if let Some(v) = section.get("raster_extension") {
            config.converter.raster_extension = parse_extension("raster_extension", v)?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
    }

    // [loader] section
    if let Some(section) = ini.section(Some("loader")) {
        if let Some(v) = section.get("workers") {
            let workers: usize = v
                .trim()
                .parse()
                .map_err(|_| invalid("loader", "workers", v, "must be a positive integer"))?;
            config.loader.workers = clamp_workers(workers);
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_ranged(
    section: &Properties,
    section_name: &str,
    key: &str,
    min: u32,
    max: u32,
) -> Result<Option<u32>, ConfigFileError> {
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    let reason = format!("must be an integer between {} and {}", min, max);
    let value: u32 = v
        .trim()
        .parse()
        .map_err(|_| invalid(section_name, key, v, &reason))?;
    if !(min..=max).contains(&value) {
        return Err(invalid(section_name, key, v, &reason));
    }
    Ok(Some(value))
}

fn parse_extension(key: &str, v: &str) -> Result<String, ConfigFileError> {
    let ext = v.trim().trim_start_matches('.');
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid(
            "converter",
            key,
            v,
            "must be a file extension like 'png' or 'paa'",
        ));
    }
    Ok(ext.to_ascii_lowercase())
}

/// Expand a leading `~/` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
