//! Proprietary tile conversion.
//!
//! Source tiles in a proprietary format (for example `.paa` textures) are
//! turned into standard raster files by an external converter. The
//! [`ConversionCache`] keeps that work memoized across runs, keyed by the
//! SHA-256 of each source file.

mod cache;
mod checksum;
mod converter;
mod record;

pub use cache::{
    ConversionCache, ConversionError, ConversionOutcome, RECORD_FILE_NAME, STAGING_DIR_NAME,
};
pub use checksum::calculate_file_checksum;
pub use converter::{
    BoxFuture, ConversionFailure, Converter, ExternalConverter, DEFAULT_CONVERTER_TIMEOUT,
};
pub use record::{CacheEntry, RecordStore};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal conversion setup errors.
///
/// These abort the whole call; per-file problems are reported as
/// [`ConversionError`]s instead.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// No converter path was configured but proprietary tiles are present.
    #[error("no converter configured; set [converter] path or pass --converter")]
    ConverterNotConfigured,

    /// The configured converter path does not exist.
    #[error("converter not found: {}", .0.display())]
    ConverterNotFound(PathBuf),

    /// The configured converter path is not an executable file.
    #[error("converter is not an executable file: {}", .0.display())]
    NotExecutable(PathBuf),

    /// The cache directory could not be created.
    #[error("failed to create cache directory {}: {source}", .path.display())]
    CacheDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
