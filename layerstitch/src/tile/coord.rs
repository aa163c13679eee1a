//! Grid coordinates for tile placement.

use std::fmt;

/// Cell position of a tile within the assembly grid.
///
/// Coordinates come straight from the tile filename and are not bounded
/// by any particular grid: a tile at `(40, 2)` is a valid coordinate even
/// when assembling a 16×16 grid, it just never gets rendered.
///
/// Ordering is `x` first, then `y`, which matches the column-major walk the
/// assembler performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    /// Column index (0-based, increases to the right)
    pub x: u32,
    /// Row index (0-based, increases downward)
    pub y: u32,
}

impl GridCoord {
    /// Create a new grid coordinate.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Whether this cell falls inside a `grid_size × grid_size` grid.
    pub fn in_grid(&self, grid_size: u32) -> bool {
        self.x < grid_size && self.y < grid_size
    }

    /// Pixel offset of this cell's top-left corner for the given tile size.
    ///
    /// Returns `None` if the offset does not fit in a `u32`.
    pub fn pixel_offset(&self, tile_width: u32, tile_height: u32) -> Option<(u32, u32)> {
        Some((
            self.x.checked_mul(tile_width)?,
            self.y.checked_mul(tile_height)?,
        ))
    }
}

/// The cell whose tile defines the size of every cell in a grid.
///
/// This is the smallest in-grid coordinate (x first, then y), or the smallest
/// coordinate overall when none lies inside the grid.
pub fn reference_coord<'a>(
    coords: impl IntoIterator<Item = &'a GridCoord>,
    grid_size: u32,
) -> Option<GridCoord> {
    let mut first_any: Option<GridCoord> = None;
    let mut first_in_grid: Option<GridCoord> = None;
    for &coord in coords {
        if first_any.map_or(true, |c| coord < c) {
            first_any = Some(coord);
        }
        if coord.in_grid(grid_size) && first_in_grid.map_or(true, |c| coord < c) {
            first_in_grid = Some(coord);
        }
    }
    first_in_grid.or(first_any)
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
