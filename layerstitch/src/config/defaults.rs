//! Default configuration values.

use std::path::PathBuf;

pub const DEFAULT_GRID_SIZE: u32 = 4;
pub const DEFAULT_TRIM_PIXELS: u32 = 0;
pub const DEFAULT_PREFIX: &str = "S";
pub const DEFAULT_BACKGROUND: &str = "#000000";

/// Layer tags offered by front-ends (satellite, mask, normal).
pub const KNOWN_PREFIXES: [&str; 3] = ["S", "M", "N"];

pub const DEFAULT_CONVERTER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SOURCE_EXTENSION: &str = "paa";
pub const DEFAULT_RASTER_EXTENSION: &str = "png";

pub const DEFAULT_LOADER_WORKERS: usize = crate::executor::DEFAULT_WORKERS;

/// Default conversion cache directory (~/.layerstitch/cache).
pub fn default_cache_directory() -> PathBuf {
    super::config_directory().join("cache")
}
