//! Assembly orchestration.
//!
//! ```text
//! list_available(source ext) ──► ConversionCache ──┐
//!                                                  ▼
//! list_available(raster ext, dir + cache dir) ──► ParallelTileLoader ──► GridAssembler ──► Canvas
//! ```
//!
//! Conversion only runs when the image directory holds proprietary tiles.
//! Every per-file failure along the way lands in the run's report; only
//! configuration problems abort.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::report::{ConversionSummary, DiscoveryError, FileErrors};
use super::{AssemblyReport, AssemblyRequest, PipelineError, PipelineResult, PreviewReport};
use super::ProgressObserver;
use crate::canvas::{estimated_file_size_mb, Assembly, GridAssembler};
use crate::config::{ConfigFile, DEFAULT_RASTER_EXTENSION, DEFAULT_SOURCE_EXTENSION};
use crate::convert::{
    ConversionCache, Converter, ExternalConverter, DEFAULT_CONVERTER_TIMEOUT,
};
use crate::executor::{clamp_workers, DEFAULT_WORKERS};
use crate::tile::{list_available, ParallelTileLoader, TileRecord};

/// Pipeline-wide settings that are not part of a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Converter executable, used when no converter is injected
    pub converter_path: Option<PathBuf>,
    pub converter_timeout: Duration,
    /// Extension of tiles needing conversion (without the dot)
    pub source_extension: String,
    /// Extension of loadable tiles (without the dot)
    pub raster_extension: String,
    /// Concurrency for loading and conversion
    pub workers: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            converter_path: None,
            converter_timeout: DEFAULT_CONVERTER_TIMEOUT,
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            raster_extension: DEFAULT_RASTER_EXTENSION.to_string(),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl PipelineSettings {
    /// Settings from the `[converter]` and `[loader]` config sections.
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            converter_path: config.converter.path.clone(),
            converter_timeout: Duration::from_secs(config.converter.timeout),
            source_extension: config.converter.source_extension.clone(),
            raster_extension: config.converter.raster_extension.clone(),
            workers: clamp_workers(config.loader.workers),
        }
    }
}

/// Tiles gathered for one run, ready to assemble.
struct Gathered {
    assembly: Assembly,
    native_size: Option<(u32, u32)>,
    conversion: ConversionSummary,
    errors: FileErrors,
}

/// Entry point for front-ends.
///
/// Owns nothing but shared handles, so one pipeline can serve many requests.
pub struct Pipeline {
    cache: Arc<ConversionCache>,
    settings: PipelineSettings,
    converter: Option<Arc<dyn Converter>>,
    loader: ParallelTileLoader,
}

impl Pipeline {
    /// Pipeline over an already opened cache.
    ///
    /// The cache must write `settings.raster_extension` files; a mismatch is
    /// reported as [`PipelineError::CacheMismatch`] by every run. Conversion
    /// concurrency is the cache's own worker count.
    pub fn new(cache: Arc<ConversionCache>, settings: PipelineSettings) -> Self {
        let loader = ParallelTileLoader::new(settings.workers);
        Self {
            cache,
            settings,
            converter: None,
            loader,
        }
    }

    /// Open the cache in `cache_dir` configured from `settings` and build a
    /// pipeline over it.
    pub fn open(cache_dir: impl Into<PathBuf>, settings: PipelineSettings) -> PipelineResult<Self> {
        let cache = ConversionCache::open(cache_dir)?
            .with_raster_extension(settings.raster_extension.clone())
            .with_workers(settings.workers);
        Ok(Self::new(Arc::new(cache), settings))
    }

    /// Use `converter` instead of resolving `settings.converter_path`.
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn cache(&self) -> &Arc<ConversionCache> {
        &self.cache
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Assemble a full-resolution canvas and write it to `output`.
    ///
    /// The file is written once, after the canvas is complete.
    pub async fn assemble(
        &self,
        request: &AssemblyRequest,
        image_dir: &Path,
        output: &Path,
        observer: &dyn ProgressObserver,
    ) -> PipelineResult<AssemblyReport> {
        if output.as_os_str().is_empty() {
            return Err(PipelineError::MissingOutputPath);
        }
        let gathered = self.gather(request, image_dir, None, observer).await?;
        let Gathered {
            assembly,
            conversion,
            errors,
            ..
        } = gathered;

        observer.report_status("Saving image...");
        let canvas_size = assembly.canvas.dimensions();
        let tile_size = assembly.canvas.tile_size();
        let output_path = output.to_path_buf();
        let canvas = assembly.canvas;
        let save_path = output_path.clone();
        tokio::task::spawn_blocking(move || canvas.save(&save_path))
            .await
            .map_err(|e| PipelineError::TaskFailed(e.to_string()))??;

        info!(
            output = %output_path.display(),
            width = canvas_size.0,
            height = canvas_size.1,
            placed = assembly.placed,
            errors = errors.len(),
            "Assembly complete"
        );
        observer.report_status(&format!("Image saved to {}", output_path.display()));

        Ok(AssemblyReport {
            output_path,
            canvas_size,
            tile_size,
            tiles_placed: assembly.placed,
            blank_cells: assembly.blank_cells,
            out_of_grid: assembly.out_of_grid,
            mismatched: assembly.mismatched,
            conversion,
            errors,
        })
    }

    /// Assemble a downsampled preview canvas.
    ///
    /// Each tile is resized to the request's preview tile size. The size the
    /// full-resolution canvas would have is estimated from the first loaded
    /// tile's trimmed dimensions and reported without rendering it.
    pub async fn preview(
        &self,
        request: &AssemblyRequest,
        image_dir: &Path,
        observer: &dyn ProgressObserver,
    ) -> PipelineResult<PreviewReport> {
        let target = request.preview_size_or_default();
        let gathered = self
            .gather(request, image_dir, Some(target), observer)
            .await?;

        let canvas = gathered.assembly.canvas;
        let preview_size = canvas.dimensions();
        let (native_width, native_height) = gathered.native_size.unwrap_or((target, target));
        let full_size = (
            native_width.saturating_mul(request.grid_size),
            native_height.saturating_mul(request.grid_size),
        );

        observer.render_preview(&canvas);
        observer.report_sizes(preview_size, full_size);
        observer.report_status("Preview loaded.");

        Ok(PreviewReport {
            canvas,
            preview_size,
            full_size,
            estimated_file_size_mb: estimated_file_size_mb(full_size.0, full_size.1),
            tiles_placed: gathered.assembly.placed,
            conversion: gathered.conversion,
            errors: gathered.errors,
        })
    }

    async fn gather(
        &self,
        request: &AssemblyRequest,
        image_dir: &Path,
        target_size: Option<u32>,
        observer: &dyn ProgressObserver,
    ) -> PipelineResult<Gathered> {
        request.validate()?;
        self.check_cache()?;
        if image_dir.as_os_str().is_empty() || !image_dir.is_dir() {
            return Err(PipelineError::MissingImageDirectory(image_dir.to_path_buf()));
        }

        let mut errors = FileErrors::default();
        let mut conversion = ConversionSummary::default();

        observer.report_status("Loading image list...");
        if !self
            .settings
            .source_extension
            .eq_ignore_ascii_case(&self.settings.raster_extension)
        {
            let sources = list_available(
                image_dir,
                None,
                &request.prefix,
                &self.settings.source_extension,
            )?;
            let files = self.screen_sources(sources, &mut errors);
            if !files.is_empty() {
                let converter = self.resolve_converter()?;
                let outcome = self
                    .cache
                    .ensure_converted(&files, image_dir, &converter, observer)
                    .await;
                conversion = ConversionSummary {
                    converted: outcome.converted,
                    reused: outcome.reused,
                };
                errors.conversion = outcome.failures;
            }
        }

        let rasters = list_available(
            image_dir,
            Some(self.cache.cache_dir()),
            &request.prefix,
            &self.settings.raster_extension,
        )?;
        if rasters.is_empty() {
            return Err(PipelineError::NoTiles {
                prefix: request.prefix.clone(),
                directory: image_dir.to_path_buf(),
            });
        }

        let mut loaded = self
            .loader
            .load_batch(rasters, request.trim_pixels, target_size, observer)
            .await;
        errors.load = std::mem::take(&mut loaded.errors);
        if loaded.tiles.is_empty() {
            warn!(failed = errors.load.len(), "No tile could be loaded");
            return Err(PipelineError::NoTiles {
                prefix: request.prefix.clone(),
                directory: image_dir.to_path_buf(),
            });
        }

        observer.report_status("Assembling canvas...");
        let grid_size = request.grid_size;
        let native_size = loaded.native_size(grid_size);
        let tiles = loaded.tiles;
        let background = request.background;
        let assembly =
            tokio::task::spawn_blocking(move || GridAssembler::assemble(&tiles, grid_size, background))
                .await
                .map_err(|e| PipelineError::TaskFailed(e.to_string()))??;

        Ok(Gathered {
            assembly,
            native_size,
            conversion,
            errors,
        })
    }

    fn check_cache(&self) -> PipelineResult<()> {
        let cache_extension = self.cache.raster_extension();
        let raster_extension = self.settings.raster_extension.trim_start_matches('.');
        if cache_extension.eq_ignore_ascii_case(raster_extension) {
            return Ok(());
        }
        Err(PipelineError::CacheMismatch {
            cache_extension: cache_extension.to_string(),
            raster_extension: raster_extension.to_string(),
        })
    }

    /// Keep proprietary files with well-formed names; record the rest.
    fn screen_sources(&self, sources: Vec<TileRecord>, errors: &mut FileErrors) -> Vec<String> {
        let mut files = Vec::with_capacity(sources.len());
        for record in sources {
            match record.coord() {
                Ok(_) => files.push(record.filename().to_string()),
                Err(error) => {
                    warn!(filename = record.filename(), %error, "Skipping malformed tile name");
                    errors.discovery.push(DiscoveryError {
                        filename: record.filename().to_string(),
                        error,
                    });
                }
            }
        }
        files
    }

    fn resolve_converter(&self) -> PipelineResult<Arc<dyn Converter>> {
        if let Some(converter) = &self.converter {
            return Ok(Arc::clone(converter));
        }
        let converter = ExternalConverter::from_configured(self.settings.converter_path.as_deref())?
            .with_timeout(self.settings.converter_timeout);
        Ok(Arc::new(converter))
    }
}
