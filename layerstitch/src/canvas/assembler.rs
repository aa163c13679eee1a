//! Grid assembly.
//!
//! Places loaded tiles onto a background-filled canvas. The per-tile size is
//! taken from the tile at [`reference_coord`]; tiles of any other size are
//! left out and reported rather than pasted over their neighbours.

use std::collections::BTreeMap;

use image::{imageops, RgbImage};
use tracing::{debug, warn};

use super::{AssembleError, Canvas};
use crate::color::BackgroundColor;
use crate::tile::{reference_coord, GridCoord};

/// Result of one assembly.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The composite image.
    pub canvas: Canvas,
    /// Tiles pasted onto the canvas.
    pub placed: usize,
    /// In-grid cells left as background.
    pub blank_cells: usize,
    /// Tiles whose coordinate lies outside the grid.
    pub out_of_grid: Vec<GridCoord>,
    /// Tiles skipped because their size differs from the reference tile.
    pub mismatched: Vec<GridCoord>,
}

/// Stateless grid assembler.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridAssembler;

impl GridAssembler {
    /// Assemble `tiles` into a `grid_size × grid_size` canvas.
    ///
    /// Cells are visited column by column (x outer, y inner). Present cells
    /// are pasted at `(x·tile_width, y·tile_height)`; absent cells keep the
    /// background color. The output depends only on the inputs, so repeated
    /// calls produce identical pixels.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::NoTiles`] for an empty mapping, and
    /// [`AssembleError::CanvasTooLarge`] if the canvas size overflows.
    pub fn assemble(
        tiles: &BTreeMap<GridCoord, RgbImage>,
        grid_size: u32,
        background: BackgroundColor,
    ) -> Result<Assembly, AssembleError> {
        let reference = reference_coord(tiles.keys(), grid_size).ok_or(AssembleError::NoTiles)?;
        let (tile_width, tile_height) = tiles
            .get(&reference)
            .map(RgbImage::dimensions)
            .ok_or(AssembleError::NoTiles)?;
        if tile_width == 0 || tile_height == 0 {
            return Err(AssembleError::EmptyTile {
                coord: reference,
                width: tile_width,
                height: tile_height,
            });
        }

        let too_large = || AssembleError::CanvasTooLarge {
            grid_size,
            tile_width,
            tile_height,
        };
        let canvas_width = tile_width.checked_mul(grid_size).ok_or_else(too_large)?;
        let canvas_height = tile_height.checked_mul(grid_size).ok_or_else(too_large)?;

        debug!(
            grid_size,
            tile_width,
            tile_height,
            canvas_width,
            canvas_height,
            tiles = tiles.len(),
            "Allocating canvas"
        );

        let mut image = RgbImage::from_pixel(canvas_width, canvas_height, background.to_rgb());
        let mut placed = 0;
        let mut blank_cells = 0;
        let mut mismatched = Vec::new();

        for x in 0..grid_size {
            for y in 0..grid_size {
                let coord = GridCoord::new(x, y);
                let Some(tile) = tiles.get(&coord) else {
                    blank_cells += 1;
                    continue;
                };

                if tile.dimensions() != (tile_width, tile_height) {
                    warn!(
                        %coord,
                        expected = ?(tile_width, tile_height),
                        actual = ?tile.dimensions(),
                        "Skipping tile with mismatched size"
                    );
                    mismatched.push(coord);
                    blank_cells += 1;
                    continue;
                }

                let (px, py) = coord
                    .pixel_offset(tile_width, tile_height)
                    .ok_or_else(too_large)?;
                imageops::replace(&mut image, tile, px as i64, py as i64);
                placed += 1;
            }
        }

        let out_of_grid: Vec<GridCoord> = tiles
            .keys()
            .filter(|coord| !coord.in_grid(grid_size))
            .copied()
            .collect();
        if !out_of_grid.is_empty() {
            debug!(
                count = out_of_grid.len(),
                grid_size, "Ignoring tiles outside the grid"
            );
        }

        Ok(Assembly {
            canvas: Canvas::new(image, tile_width, tile_height, grid_size),
            placed,
            blank_cells,
            out_of_grid,
            mismatched,
        })
    }
}
