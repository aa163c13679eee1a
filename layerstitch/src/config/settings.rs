//! Settings structs, one per `[section]` of config.ini.

use std::path::PathBuf;

use super::defaults::*;
use crate::color::BackgroundColor;
use crate::pipeline::DEFAULT_PREVIEW_TILE_SIZE;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub assembly: AssemblySettings,
    pub converter: ConverterSettings,
    pub cache: CacheSettings,
    pub loader: LoaderSettings,
}

/// Default assembly parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySettings {
    pub grid_size: u32,
    pub trim_pixels: u32,
    pub prefix: String,
    pub background: BackgroundColor,
    pub preview_tile_size: u32,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            trim_pixels: DEFAULT_TRIM_PIXELS,
            prefix: DEFAULT_PREFIX.to_string(),
            background: BackgroundColor::default(),
            preview_tile_size: DEFAULT_PREVIEW_TILE_SIZE,
        }
    }
}

/// External converter settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterSettings {
    /// Converter executable; required only when proprietary tiles are present
    pub path: Option<PathBuf>,
    /// Per-invocation timeout in seconds
    pub timeout: u64,
    /// Extension of files that need conversion (without the dot)
    pub source_extension: String,
    /// Extension of converter output and loadable tiles
    pub raster_extension: String,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            path: None,
            timeout: DEFAULT_CONVERTER_TIMEOUT_SECS,
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            raster_extension: DEFAULT_RASTER_EXTENSION.to_string(),
        }
    }
}

/// Conversion cache settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub directory: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    /// Concurrent loads/conversions (clamped to 1..=64)
    pub workers: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_LOADER_WORKERS,
        }
    }
}
