//! Non-overlapping tiling of an image into fixed-size square patches.
//!
//! Tiles start at offsets that are multiples of `tile_size` along both axes
//! and are produced in raster order (top-to-bottom, then left-to-right).
//! A tile is produced only when it fits entirely inside the image; pixels in
//! the right and bottom strips that no full tile covers are never visited.

use crate::image::{Image, ImageView};
use crate::util::{DenoiseError, DenoiseResult};

/// One full-size tile: its top-left offset and a copy of its pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    /// Row (vertical) offset of the top-left pixel.
    pub row: usize,
    /// Column (horizontal) offset of the top-left pixel.
    pub col: usize,
    /// Copied `tile_size x tile_size` patch.
    pub patch: Image,
}

/// Grid geometry of the full tiles of a `width x height` image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tile_size: usize,
}

impl TileGrid {
    /// Creates the grid; `tile_size` must be non-zero.
    pub fn new(width: usize, height: usize, tile_size: usize) -> DenoiseResult<Self> {
        if tile_size == 0 {
            return Err(DenoiseError::InvalidInput("tile_size must be at least 1"));
        }
        Ok(Self {
            width,
            height,
            tile_size,
        })
    }

    /// Returns the tile edge length.
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Number of full tiles along the vertical axis.
    pub fn rows(&self) -> usize {
        self.height / self.tile_size
    }

    /// Number of full tiles along the horizontal axis.
    pub fn cols(&self) -> usize {
        self.width / self.tile_size
    }

    /// Total number of full tiles.
    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Returns true when no full tile fits.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over `(row, col)` offsets in raster order.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, usize)> + Clone {
        let step = self.tile_size;
        let cols = self.cols();
        (0..self.rows()).flat_map(move |r| (0..cols).map(move |c| (r * step, c * step)))
    }
}

/// Lazy iterator over the full tiles of an image.
pub struct Tiles<'a> {
    image: ImageView<'a, f64>,
    tile_size: usize,
    offsets: Box<dyn Iterator<Item = (usize, usize)> + 'a>,
}

impl Iterator for Tiles<'_> {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let (row, col) = self.offsets.next()?;
        let patch = self
            .image
            .roi(col, row, self.tile_size, self.tile_size)
            .ok()?
            .to_image();
        Some(Tile { row, col, patch })
    }
}

/// Iterates over the full `tile_size` tiles of `image` in raster order.
///
/// Iteration is restartable: calling this again on the same image yields
/// identical tiles.
pub fn iter_tiles(image: &Image, tile_size: usize) -> DenoiseResult<Tiles<'_>> {
    let grid = TileGrid::new(image.width(), image.height(), tile_size)?;
    Ok(Tiles {
        image: image.view(),
        tile_size,
        offsets: Box::new(grid.offsets()),
    })
}

/// Overwrites `[row..row + tile_size, col..col + tile_size]` of `output`.
///
/// The caller guarantees the tile came from [`iter_tiles`] on an image of
/// the same shape as `output`.
pub fn write_tile(output: &mut Image, row: usize, col: usize, tile_size: usize, patch: &Image) {
    debug_assert!(row + tile_size <= output.height() && col + tile_size <= output.width());
    debug_assert_eq!(patch.shape(), (tile_size, tile_size));
    let src = patch.data();
    for ty in 0..tile_size {
        if let Some(dst_row) = output.row_mut(row + ty) {
            let src_row = &src[ty * tile_size..(ty + 1) * tile_size];
            dst_row[col..col + tile_size].copy_from_slice(src_row);
        }
    }
}
