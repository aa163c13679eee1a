//! End-to-end assembly pipeline.
//!
//! A front-end builds an [`AssemblyRequest`], hands it to a [`Pipeline`]
//! together with a [`ProgressObserver`], and gets back a report:
//!
//! ```ignore
//! let cache = Arc::new(ConversionCache::open(&config.cache.directory)?);
//! let pipeline = Pipeline::new(cache, PipelineSettings::from_config(&config));
//! let request = AssemblyRequest::new(16, "S").with_trim(16);
//! let report = pipeline.assemble(&request, &image_dir, &output, &LogObserver).await?;
//! ```

mod error;
mod orchestrator;
pub(crate) mod progress;
mod report;
mod request;

pub use error::{PipelineError, PipelineResult};
pub use orchestrator::{Pipeline, PipelineSettings};
pub use progress::{LogObserver, NullObserver, ProgressObserver};
pub use report::{
    AssemblyReport, ConversionSummary, DiscoveryError, FileErrors, PreviewReport,
};
pub use request::{
    AssemblyRequest, DEFAULT_PREVIEW_TILE_SIZE, MAX_GRID_SIZE, MAX_PREVIEW_TILE_SIZE,
    MAX_TRIM_PIXELS,
};
