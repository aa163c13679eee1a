//! Composite canvas and grid assembly.
//!
//! The [`GridAssembler`] turns a coordinate→tile mapping into a [`Canvas`].
//! A canvas is only ever written to disk once it is complete, via a sibling
//! temporary file that is renamed into place.

mod assembler;

pub use assembler::{Assembly, GridAssembler};

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use thiserror::Error;

/// Errors from assembling or saving a canvas.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// No tiles were supplied, so the tile size is unknown.
    #[error("no tiles to assemble")]
    NoTiles,

    /// A tile has zero width or height.
    #[error("tile at {coord} has zero-area dimensions {width}x{height}")]
    EmptyTile {
        coord: crate::tile::GridCoord,
        width: u32,
        height: u32,
    },

    /// Canvas dimensions overflow.
    #[error("canvas of {grid_size}x{grid_size} tiles at {tile_width}x{tile_height} is too large")]
    CanvasTooLarge {
        grid_size: u32,
        tile_width: u32,
        tile_height: u32,
    },

    /// Output extension does not map to a known image format.
    #[error("cannot infer image format from {}", .path.display())]
    UnknownFormat { path: PathBuf },

    /// Encoding or writing the output failed.
    #[error("failed to write {}: {reason}", .path.display())]
    WriteFailed { path: PathBuf, reason: String },
}

/// A fully assembled composite image.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    image: RgbImage,
    tile_width: u32,
    tile_height: u32,
    grid_size: u32,
}

impl Canvas {
    pub(crate) fn new(image: RgbImage, tile_width: u32, tile_height: u32, grid_size: u32) -> Self {
        Self {
            image,
            tile_width,
            tile_height,
            grid_size,
        }
    }

    /// Canvas pixels.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Size of one grid cell in pixels.
    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    /// Number of cells along each edge.
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Write the canvas to `path`, inferring the format from the extension.
    ///
    /// The image is encoded into `<path>.partial` and renamed over `path`
    /// once complete, so a failed save never leaves a truncated output.
    pub fn save(&self, path: &Path) -> Result<(), AssembleError> {
        let format = ImageFormat::from_path(path).map_err(|_| AssembleError::UnknownFormat {
            path: path.to_path_buf(),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AssembleError::WriteFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".partial");
        let temp_path = PathBuf::from(temp_name);

        let write_failed = |reason: String| AssembleError::WriteFailed {
            path: path.to_path_buf(),
            reason,
        };

        if let Err(e) = self.image.save_with_format(&temp_path, format) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_failed(e.to_string()));
        }
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            write_failed(e.to_string())
        })?;

        tracing::info!(
            path = %path.display(),
            width = self.image.width(),
            height = self.image.height(),
            "Saved canvas"
        );
        Ok(())
    }
}

/// Rough encoded size of a full-resolution RGB canvas in MiB.
///
/// Assumes roughly 10:1 compression over raw RGB8.
pub fn estimated_file_size_mb(width: u32, height: u32) -> f64 {
    (width as f64 * height as f64 * 3.0) / (1024.0 * 1024.0) / 10.0
}
