//! Tile naming, discovery and loading.
//!
//! A layer is a set of files named `<tag>_<x>_<y>_<suffix>.<ext>` sharing a
//! tag prefix. This module turns a directory of such files into decoded,
//! trimmed tiles keyed by their [`GridCoord`].

mod coord;
mod filename;
mod index;
mod loader;

pub use coord::{reference_coord, GridCoord};
pub use filename::{format_tile_filename, parse_tile_filename, TileFilename, TileNameError};
pub use index::{has_extension, list_available, IndexError, TileRecord};
pub use loader::{crop_rect, LoadError, LoadOutcome, ParallelTileLoader};
