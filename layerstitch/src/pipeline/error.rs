//! Pipeline errors.
//!
//! Only configuration-level problems are errors here. Per-file failures are
//! collected into the run's report instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::canvas::AssembleError;
use crate::convert::ConvertError;
use crate::tile::IndexError;

/// Fatal errors that abort an assembly or preview.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request parameters out of bounds.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The image directory was not given or does not exist.
    #[error("image directory not found: {}", .0.display())]
    MissingImageDirectory(PathBuf),

    /// No output path was given.
    #[error("no output path specified")]
    MissingOutputPath,

    /// Nothing matched the prefix, or every matching tile failed.
    #[error("no usable tiles with prefix '{prefix}' in {}", .directory.display())]
    NoTiles { prefix: String, directory: PathBuf },

    /// The conversion cache writes a different raster format than the
    /// pipeline loads.
    #[error(
        "conversion cache writes .{cache_extension} files but the pipeline loads .{raster_extension}"
    )]
    CacheMismatch {
        cache_extension: String,
        raster_extension: String,
    },

    /// A blocking assembly task panicked or was cancelled.
    #[error("assembly task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
