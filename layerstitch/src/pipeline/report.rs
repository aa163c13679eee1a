//! Run reports.
//!
//! Per-file failures never abort a run; they are gathered here so the caller
//! can show a count or a list once the canvas is done.

use std::fmt;
use std::path::PathBuf;

use crate::canvas::Canvas;
use crate::convert::ConversionError;
use crate::tile::{GridCoord, LoadError, TileNameError};

/// A proprietary file skipped before conversion because of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryError {
    pub filename: String,
    pub error: TileNameError,
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.filename, self.error)
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Every per-file failure from one run, grouped by stage.
#[derive(Debug, Default)]
pub struct FileErrors {
    pub discovery: Vec<DiscoveryError>,
    pub conversion: Vec<ConversionError>,
    pub load: Vec<LoadError>,
}

impl FileErrors {
    /// Total number of failed files.
    pub fn len(&self) -> usize {
        self.discovery.len() + self.conversion.len() + self.load.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One line per failure, in stage order.
    pub fn messages(&self) -> Vec<String> {
        self.discovery
            .iter()
            .map(ToString::to_string)
            .chain(self.conversion.iter().map(ToString::to_string))
            .chain(self.load.iter().map(ToString::to_string))
            .collect()
    }
}

/// Conversion counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub converted: usize,
    pub reused: usize,
}

/// Outcome of a full-resolution assembly.
#[derive(Debug)]
pub struct AssemblyReport {
    /// Where the canvas was written.
    pub output_path: PathBuf,
    /// Canvas size in pixels.
    pub canvas_size: (u32, u32),
    /// Size of one cell in pixels.
    pub tile_size: (u32, u32),
    /// Tiles pasted onto the canvas.
    pub tiles_placed: usize,
    /// In-grid cells left as background.
    pub blank_cells: usize,
    /// Loaded tiles whose coordinate lies outside the grid.
    pub out_of_grid: Vec<GridCoord>,
    /// Tiles skipped for not matching the canvas tile size.
    pub mismatched: Vec<GridCoord>,
    pub conversion: ConversionSummary,
    pub errors: FileErrors,
}

/// Outcome of a preview.
#[derive(Debug)]
pub struct PreviewReport {
    /// The downsampled canvas.
    pub canvas: Canvas,
    /// Preview canvas size in pixels.
    pub preview_size: (u32, u32),
    /// Size the full-resolution canvas would have.
    pub full_size: (u32, u32),
    /// Rough encoded size of the full-resolution canvas in MiB.
    pub estimated_file_size_mb: f64,
    pub tiles_placed: usize,
    pub conversion: ConversionSummary,
    pub errors: FileErrors,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionFailure;

    #[test]
    fn test_file_errors_messages() {
        let errors = FileErrors {
            discovery: vec![DiscoveryError {
                filename: "S_x_lco.paa".to_string(),
                error: TileNameError::TokenCount(3),
            }],
            conversion: vec![ConversionError {
                filename: "S_1_1_lco.paa".to_string(),
                failure: ConversionFailure::TimedOut { timeout_secs: 30 },
            }],
            load: Vec::new(),
        };

        assert_eq!(errors.len(), 2);
        assert!(!errors.is_empty());
        let messages = errors.messages();
        assert!(messages[0].starts_with("S_x_lco.paa: expected"));
        assert_eq!(messages[1], "S_1_1_lco.paa: converter timed out after 30s");
    }

    #[test]
    fn test_empty_errors() {
        assert!(FileErrors::default().is_empty());
    }
}
