//! Parallel tile loading.
//!
//! Decodes, trims and optionally downsamples a batch of raster tiles on a
//! bounded [`WorkerPool`]. Decoding is blocking work, so each job hands the
//! actual file I/O to `spawn_blocking` while holding a pool permit.
//!
//! One bad tile never sinks the batch: malformed names, unreadable files
//! and degenerate crops are collected as [`LoadError`]s and the tile is
//! simply absent from the result mapping.

use std::collections::BTreeMap;
use std::path::PathBuf;

use image::imageops::FilterType;
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{reference_coord, GridCoord, TileNameError, TileRecord};
use crate::executor::{clamp_workers, WorkerPool, DEFAULT_WORKERS};
use crate::pipeline::ProgressObserver;

/// Per-tile load failure.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Filename does not encode a grid coordinate.
    #[error("{filename}: {source}")]
    Filename {
        filename: String,
        #[source]
        source: TileNameError,
    },

    /// File could not be read or decoded.
    #[error("{filename}: failed to decode {}: {reason}", .path.display())]
    Decode {
        filename: String,
        path: PathBuf,
        reason: String,
    },

    /// Trimming would leave no pixels.
    #[error("{filename}: trimming {trim}px from each edge of a {width}x{height} tile leaves nothing")]
    DegenerateCrop {
        filename: String,
        width: u32,
        height: u32,
        trim: u32,
    },

    /// The worker running this tile failed.
    #[error("{filename}: {reason}")]
    Worker { filename: String, reason: String },
}

impl LoadError {
    /// Name of the tile file that failed.
    pub fn filename(&self) -> &str {
        match self {
            LoadError::Filename { filename, .. }
            | LoadError::Decode { filename, .. }
            | LoadError::DegenerateCrop { filename, .. }
            | LoadError::Worker { filename, .. } => filename,
        }
    }
}

/// Outcome of loading one batch.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Successfully loaded tiles keyed by grid cell.
    pub tiles: BTreeMap<GridCoord, RgbImage>,
    /// Tiles that failed, in submission order.
    pub errors: Vec<LoadError>,
    /// Trimmed size of each loaded tile before any downsampling.
    pub native_sizes: BTreeMap<GridCoord, (u32, u32)>,
}

impl LoadOutcome {
    /// Native size of the tile at [`reference_coord`] for this grid.
    pub fn native_size(&self, grid_size: u32) -> Option<(u32, u32)> {
        let reference = reference_coord(self.native_sizes.keys(), grid_size)?;
        self.native_sizes.get(&reference).copied()
    }
}

/// A single tile that loaded successfully.
struct LoadedTile {
    coord: GridCoord,
    image: RgbImage,
    native_size: (u32, u32),
}

/// Loads tile batches with bounded concurrency.
#[derive(Debug, Clone)]
pub struct ParallelTileLoader {
    workers: usize,
}

impl Default for ParallelTileLoader {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl ParallelTileLoader {
    /// Create a loader running at most `workers` tiles at once (1..=64).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: clamp_workers(workers),
        }
    }

    /// Configured concurrency limit.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Load a batch of tiles.
    ///
    /// Each tile is trimmed by `trim` pixels on all four edges. With a
    /// `target_size` the trimmed tile is resized to a `target_size` square
    /// (preview mode); otherwise it keeps its trimmed native size.
    ///
    /// Duplicate coordinates resolve to the later record in `records`.
    pub async fn load_batch(
        &self,
        records: Vec<TileRecord>,
        trim: u32,
        target_size: Option<u32>,
        observer: &dyn ProgressObserver,
    ) -> LoadOutcome {
        let total = records.len();
        let mut outcome = LoadOutcome::default();
        if total == 0 {
            return outcome;
        }

        info!(
            tiles = total,
            trim,
            target_size = ?target_size,
            workers = self.workers,
            "Loading tile batch"
        );
        observer.report_status(&format!("Loading {} tiles...", total));
        observer.report_progress(0, total);

        let filenames: Vec<String> = records.iter().map(|r| r.filename().to_string()).collect();
        let pool = WorkerPool::new(self.workers, total, "tile_loader");
        let jobs: Vec<_> = records
            .into_iter()
            .map(|record| async move {
                let filename = record.filename().to_string();
                tokio::task::spawn_blocking(move || load_tile(&record, trim, target_size))
                    .await
                    .unwrap_or_else(|e| {
                        Err(LoadError::Worker {
                            filename,
                            reason: e.to_string(),
                        })
                    })
            })
            .collect();

        let results = pool
            .run(jobs, |done, total| observer.report_progress(done, total))
            .await;

        for (filename, result) in filenames.into_iter().zip(results) {
            let result = result.unwrap_or_else(|e| {
                Err(LoadError::Worker {
                    filename: filename.clone(),
                    reason: e.to_string(),
                })
            });
            match result {
                Ok(tile) => {
                    debug!(filename = %filename, coord = %tile.coord, "Loaded tile");
                    outcome.native_sizes.insert(tile.coord, tile.native_size);
                    outcome.tiles.insert(tile.coord, tile.image);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load tile");
                    outcome.errors.push(e);
                }
            }
        }

        info!(
            loaded = outcome.tiles.len(),
            failed = outcome.errors.len(),
            "Tile batch complete"
        );
        observer.report_status(&format!(
            "Loaded {} of {} tiles",
            outcome.tiles.len(),
            total
        ));

        outcome
    }
}

/// Trim `trim` pixels from each edge of an image of the given size.
///
/// Returns the crop rectangle `(x, y, width, height)`, or `None` when
/// nothing would remain.
pub fn crop_rect(width: u32, height: u32, trim: u32) -> Option<(u32, u32, u32, u32)> {
    let twice = trim.checked_mul(2)?;
    if twice >= width || twice >= height {
        return None;
    }
    Some((trim, trim, width - twice, height - twice))
}

fn load_tile(
    record: &TileRecord,
    trim: u32,
    target_size: Option<u32>,
) -> Result<LoadedTile, LoadError> {
    let filename = record.filename().to_string();
    let coord = record.coord().map_err(|source| LoadError::Filename {
        filename: filename.clone(),
        source,
    })?;

    let path = record.path();
    let image = image::open(&path).map_err(|e| LoadError::Decode {
        filename: filename.clone(),
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let (width, height) = (image.width(), image.height());
    let (x, y, crop_width, crop_height) =
        crop_rect(width, height, trim).ok_or(LoadError::DegenerateCrop {
            filename,
            width,
            height,
            trim,
        })?;

    let cropped = image.crop_imm(x, y, crop_width, crop_height).to_rgb8();
    let native_size = cropped.dimensions();

    let image = match target_size {
        Some(size) => image::imageops::resize(&cropped, size, size, FilterType::Triangle),
        None => cropped,
    };

    Ok(LoadedTile {
        coord,
        image,
        native_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::progress::RecordingObserver;
    use crate::pipeline::NullObserver;
    use image::Rgb;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_tile(dir: &Path, name: &str, width: u32, height: u32, value: u8) {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
            .save(dir.join(name))
            .unwrap();
    }

    fn records(dir: &Path, names: &[&str]) -> Vec<TileRecord> {
        names.iter().map(|n| TileRecord::new(*n, dir)).collect()
    }

    #[test]
    fn test_crop_rect() {
        assert_eq!(crop_rect(256, 256, 0), Some((0, 0, 256, 256)));
        assert_eq!(crop_rect(256, 256, 16), Some((16, 16, 224, 224)));
        assert_eq!(crop_rect(10, 20, 4), Some((4, 4, 2, 12)));
        assert_eq!(crop_rect(10, 20, 5), None);
        assert_eq!(crop_rect(64, 8, 4), None);
        assert_eq!(crop_rect(8, 8, u32::MAX), None);
    }

    #[tokio::test]
    async fn test_load_native_with_trim() {
        let temp = TempDir::new().unwrap();
        write_tile(temp.path(), "S_0_0_lco.png", 32, 32, 10);
        write_tile(temp.path(), "S_1_0_lco.png", 32, 32, 20);

        let loader = ParallelTileLoader::new(2);
        let outcome = loader
            .load_batch(
                records(temp.path(), &["S_0_0_lco.png", "S_1_0_lco.png"]),
                4,
                None,
                &NullObserver,
            )
            .await;

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.tiles.len(), 2);
        assert_eq!(outcome.tiles[&GridCoord::new(0, 0)].dimensions(), (24, 24));
        assert_eq!(outcome.native_size(2), Some((24, 24)));
    }

    #[tokio::test]
    async fn test_load_preview_resizes() {
        let temp = TempDir::new().unwrap();
        write_tile(temp.path(), "S_0_0_lco.png", 64, 48, 10);

        let outcome = ParallelTileLoader::default()
            .load_batch(
                records(temp.path(), &["S_0_0_lco.png"]),
                2,
                Some(16),
                &NullObserver,
            )
            .await;

        let tile = &outcome.tiles[&GridCoord::new(0, 0)];
        assert_eq!(tile.dimensions(), (16, 16));
        assert_eq!(outcome.native_size(2), Some((60, 44)));
    }

    #[tokio::test]
    async fn test_native_size_from_first_grid_tile() {
        let temp = TempDir::new().unwrap();
        // Sorts first by name but lies outside a 2x2 grid.
        write_tile(temp.path(), "S_0_9_lco.png", 40, 40, 10);
        write_tile(temp.path(), "S_1_0_lco.png", 20, 20, 20);
        write_tile(temp.path(), "S_0_1_lco.png", 24, 24, 30);

        let outcome = ParallelTileLoader::new(3)
            .load_batch(
                records(
                    temp.path(),
                    &["S_0_9_lco.png", "S_1_0_lco.png", "S_0_1_lco.png"],
                ),
                0,
                None,
                &NullObserver,
            )
            .await;

        assert_eq!(outcome.native_sizes.len(), 3);
        assert_eq!(outcome.native_size(2), Some((24, 24)));
    }

    #[tokio::test]
    async fn test_partial_failures_isolated() {
        let temp = TempDir::new().unwrap();
        write_tile(temp.path(), "S_0_0_lco.png", 16, 16, 1);
        write_tile(temp.path(), "S_1_0_lco.png", 16, 16, 2);
        write_tile(temp.path(), "S_2_0_lco.png", 16, 16, 3);
        write_tile(temp.path(), "S_bad_lco.png", 16, 16, 4);
        std::fs::write(temp.path().join("S_3_0_lco.png"), b"not an image").unwrap();

        let outcome = ParallelTileLoader::new(4)
            .load_batch(
                records(
                    temp.path(),
                    &[
                        "S_0_0_lco.png",
                        "S_1_0_lco.png",
                        "S_2_0_lco.png",
                        "S_bad_lco.png",
                        "S_3_0_lco.png",
                    ],
                ),
                0,
                None,
                &NullObserver,
            )
            .await;

        assert_eq!(outcome.tiles.len(), 3);
        assert_eq!(outcome.errors.len(), 2);
        assert!(matches!(outcome.errors[0], LoadError::Filename { .. }));
        assert_eq!(outcome.errors[0].filename(), "S_bad_lco.png");
        assert!(matches!(outcome.errors[1], LoadError::Decode { .. }));
        assert_eq!(outcome.errors[1].filename(), "S_3_0_lco.png");
    }

    #[tokio::test]
    async fn test_missing_file_is_decode_error() {
        let temp = TempDir::new().unwrap();

        let outcome = ParallelTileLoader::default()
            .load_batch(
                records(temp.path(), &["S_0_0_lco.png"]),
                0,
                None,
                &NullObserver,
            )
            .await;

        assert!(outcome.tiles.is_empty());
        assert!(matches!(outcome.errors[0], LoadError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_degenerate_crop() {
        let temp = TempDir::new().unwrap();
        write_tile(temp.path(), "S_0_0_lco.png", 8, 8, 1);

        let outcome = ParallelTileLoader::default()
            .load_batch(
                records(temp.path(), &["S_0_0_lco.png"]),
                4,
                None,
                &NullObserver,
            )
            .await;

        assert!(outcome.tiles.is_empty());
        assert!(matches!(
            outcome.errors[0],
            LoadError::DegenerateCrop {
                width: 8,
                height: 8,
                trim: 4,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_progress_reported_per_tile() {
        let temp = TempDir::new().unwrap();
        let names: Vec<String> = (0..5).map(|i| format!("S_{}_0_lco.png", i)).collect();
        for name in &names {
            write_tile(temp.path(), name, 4, 4, 9);
        }
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let observer = RecordingObserver::default();
        ParallelTileLoader::new(3)
            .load_batch(records(temp.path(), &refs), 0, None, &observer)
            .await;

        let progress = observer.progress.lock().clone();
        assert_eq!(
            progress,
            vec![(0, 5), (1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]
        );
        assert!(!observer.statuses.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let observer = RecordingObserver::default();
        let outcome = ParallelTileLoader::default()
            .load_batch(Vec::new(), 0, None, &observer)
            .await;

        assert!(outcome.tiles.is_empty());
        assert!(outcome.errors.is_empty());
        assert!(observer.progress.lock().is_empty());
    }

    #[test]
    fn test_workers_clamped() {
        assert_eq!(ParallelTileLoader::new(0).workers(), 1);
        assert_eq!(ParallelTileLoader::new(500).workers(), 64);
        assert_eq!(ParallelTileLoader::default().workers(), 4);
    }
}
