//! INI serialization: `ConfigFile` → commented config.ini text.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let converter_path = config
        .converter
        .path
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[assembly]
; Tiles along each edge of the canvas (1-128)
grid_size = {}
; Pixels cropped from every tile edge before assembly (0-32)
trim_pixels = {}
; Layer tag selecting which tiles to assemble (e.g. S, M, N)
prefix = {}
; Fill color for grid cells without a tile (#rrggbb, #rgb, or a color name)
background = {}
; Edge length of each tile in previews, in pixels (1-4096)
preview_tile_size = {}

[converter]
; Executable converting proprietary tiles: <path> <input> <output>
; Only required when the image directory contains proprietary tiles
path = {}
; Seconds before a single conversion is abandoned
timeout = {}
; Extension of tiles that need conversion
source_extension = {}
; Extension of converter output and directly loadable tiles
raster_extension = {}

[cache]
; Where converted tiles and conversion_cache.json are kept
directory = {}

[loader]
; Concurrent tile loads and conversions (1-64)
workers = {}
"#,
        config.assembly.grid_size,
        config.assembly.trim_pixels,
        config.assembly.prefix,
        config.assembly.background,
        config.assembly.preview_tile_size,
        converter_path,
        config.converter.timeout,
        config.converter.source_extension,
        config.converter.raster_extension,
        path_to_string(&config.cache.directory),
        config.loader.workers,
    )
}

/// Convert path to string, collapsing the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
