//! LayerStitch - map layer tile stitching
//!
//! This library assembles a sparse grid of same-sized tile images into one
//! composite canvas. Tiles in a proprietary texture format are converted to
//! a standard raster format first through an external converter, with the
//! results memoized in a content-hash keyed conversion cache.
//!
//! # High-Level API
//!
//! The [`pipeline`] module ties the pieces together:
//!
//! ```ignore
//! use layerstitch::convert::ConversionCache;
//! use layerstitch::pipeline::{AssemblyRequest, LogObserver, Pipeline, PipelineSettings};
//!
//! let cache = ConversionCache::open("/tmp/layerstitch-cache")?;
//! let pipeline = Pipeline::new(cache.into(), PipelineSettings::default());
//!
//! let request = AssemblyRequest::new(16, "S").with_trim(1);
//! let report = pipeline
//!     .assemble(&request, "tiles/".as_ref(), "map.png".as_ref(), &LogObserver)
//!     .await?;
//! println!("placed {} tiles", report.tiles_placed);
//! ```

pub mod canvas;
pub mod color;
pub mod config;
pub mod convert;
pub mod executor;
pub mod logging;
pub mod pipeline;
pub mod tile;

/// Version of the LayerStitch library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
