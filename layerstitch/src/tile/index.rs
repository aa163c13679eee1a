//! Tile discovery.
//!
//! Scans a primary image directory and an optional cache directory for
//! files belonging to one layer. The cache directory holds raster output
//! from earlier conversions and acts as a fallback: when the same filename
//! exists in both places, the primary directory wins.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::{parse_tile_filename, GridCoord, TileNameError};

/// A discovered tile file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    filename: String,
    source_dir: PathBuf,
}

impl TileRecord {
    /// Create a record for `filename` inside `source_dir`.
    pub fn new(filename: impl Into<String>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            source_dir: source_dir.into(),
        }
    }

    /// The bare filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Directory the file was found in.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Full path to the file.
    pub fn path(&self) -> PathBuf {
        self.source_dir.join(&self.filename)
    }

    /// Grid coordinate encoded in the filename.
    pub fn coord(&self) -> Result<GridCoord, TileNameError> {
        parse_tile_filename(&self.filename).map(|name| name.coord)
    }
}

/// Errors raised while scanning for tiles.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The primary image directory could not be listed.
    #[error("failed to read image directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// List tile files for one layer.
///
/// Both directories are scanned non-recursively for files whose name starts
/// with `prefix` and carries `extension` (matched case-insensitively, without
/// the leading dot). The result is sorted by filename.
///
/// A missing or unreadable `cache_dir` is treated as empty since it may not
/// have been created yet. An unreadable `directory` is an error.
pub fn list_available(
    directory: &Path,
    cache_dir: Option<&Path>,
    prefix: &str,
    extension: &str,
) -> Result<Vec<TileRecord>, IndexError> {
    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();

    if let Some(cache_dir) = cache_dir {
        if cache_dir != directory {
            match scan_directory(cache_dir, prefix, extension) {
                Ok(names) => {
                    for name in names {
                        found.insert(name, cache_dir.to_path_buf());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(
                        path = %cache_dir.display(),
                        error = %e,
                        "Failed to read cache directory, ignoring it"
                    );
                }
            }
        }
    }

    let cached = found.len();

    // Primary entries overwrite cache entries with the same name
    let primary = scan_directory(directory, prefix, extension).map_err(|e| IndexError::ReadDir {
        path: directory.to_path_buf(),
        source: e,
    })?;
    for name in primary {
        found.insert(name, directory.to_path_buf());
    }

    debug!(
        directory = %directory.display(),
        prefix,
        extension,
        total = found.len(),
        from_cache = cached,
        "Tile scan complete"
    );

    Ok(found
        .into_iter()
        .map(|(filename, dir)| TileRecord::new(filename, dir))
        .collect())
}

/// Whether `filename` ends with `.extension`, ignoring ASCII case.
pub fn has_extension(filename: &str, extension: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

fn scan_directory(dir: &Path, prefix: &str, extension: &str) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with(prefix) && has_extension(&name, extension) {
            names.push(name);
        }
    }
    Ok(names)
}
