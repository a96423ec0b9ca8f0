//! Grid specification and tile geometry.
//!
//! Tiles all share one size, `floor(width / columns) x floor(height / rows)`.
//! Pixels left over on the right and bottom edges by the integer division are
//! not part of any tile.

use std::fmt;
use std::str::FromStr;

use crate::error::{TileError, ValidationError};

/// Largest number of columns or rows a grid may have.
pub const MAX_GRID_DIMENSION: u32 = 10;

/// A `columns x rows` partitioning, both in `1..=MAX_GRID_DIMENSION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSpec {
    columns: u32,
    rows: u32,
}

impl GridSpec {
    /// Create a grid, validating both dimensions.
    pub fn new(columns: u32, rows: u32) -> Result<Self, ValidationError> {
        if !in_range(columns) || !in_range(rows) {
            return Err(ValidationError::GridOutOfRange {
                value: format!("{}x{}", columns, rows),
                max: MAX_GRID_DIMENSION,
            });
        }
        Ok(Self { columns, rows })
    }

    /// Parse a grid written as `<cols>x<rows>`, e.g. `"3x2"`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidGrid {
            value: value.to_string(),
        };

        let (cols, rows) = value.split_once('x').ok_or_else(invalid)?;
        if !is_digits(cols) || !is_digits(rows) {
            return Err(invalid());
        }

        // Digit strings too long for u32 are out of range, not malformed
        let out_of_range = || ValidationError::GridOutOfRange {
            value: value.to_string(),
            max: MAX_GRID_DIMENSION,
        };
        let columns: u32 = cols.parse().map_err(|_| out_of_range())?;
        let rows: u32 = rows.parse().map_err(|_| out_of_range())?;

        if !in_range(columns) || !in_range(rows) {
            return Err(out_of_range());
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of tiles the grid produces.
    pub fn tile_count(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    /// Compute the tile layout for an image of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::Geometry`] if the grid is finer than the image,
    /// i.e. a tile would be zero pixels wide or tall.
    pub fn layout(&self, width: u32, height: u32) -> Result<TileLayout, TileError> {
        let tile_width = width / self.columns;
        let tile_height = height / self.rows;

        if tile_width == 0 || tile_height == 0 {
            return Err(TileError::Geometry {
                columns: self.columns,
                rows: self.rows,
                width,
                height,
            });
        }

        Ok(TileLayout {
            grid: *self,
            tile_width,
            tile_height,
        })
    }
}

fn in_range(n: u32) -> bool {
    (1..=MAX_GRID_DIMENSION).contains(&n)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for GridSpec {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

// =============================================================================
// Tile Geometry
// =============================================================================

/// Pixel rectangle of one tile within the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Zero-based column index
    pub column: u32,

    /// Zero-based row index
    pub row: u32,

    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Tile geometry of a grid applied to a concrete image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayout {
    grid: GridSpec,
    tile_width: u32,
    tile_height: u32,
}

impl TileLayout {
    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Tiles in row-major order: all columns of row 0, then row 1, ...
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.grid.rows).flat_map(move |row| {
            (0..self.grid.columns).map(move |column| Tile {
                column,
                row,
                left: column * self.tile_width,
                top: row * self.tile_height,
                width: self.tile_width,
                height: self.tile_height,
            })
        })
    }
}
