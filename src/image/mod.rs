//! Grayscale image buffers and views.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. ROI slices are zero-copy
//! views into the same backing slice and retain the original stride.
//!
//! `Image` is the owned, contiguous `f64` grid the pipeline works on. Pixel
//! intensities are kept in `f64` so standardization round-trips exactly
//! enough for metric computation.

use crate::util::{DenoiseError, DenoiseResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod standardize;

pub use standardize::{reverse_standardize, standardize, standardize_or_center, Standardized};

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> DenoiseResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> DenoiseResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(DenoiseError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(height, width)`, rows first.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Iterates over the rows of the view.
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + 'a
    where
        T: 'a,
    {
        let (data, width, stride) = (self.data, self.width, self.stride);
        (0..self.height).map(move |y| &data[y * stride..y * stride + width])
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> DenoiseResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(DenoiseError::InvalidDimensions { width, height });
        }
        let fits = x
            .checked_add(width)
            .zip(y.checked_add(height))
            .map(|(end_x, end_y)| end_x <= self.width && end_y <= self.height)
            .unwrap_or(false);
        if !fits {
            return Err(DenoiseError::InvalidInput("roi out of bounds"));
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x))
            .ok_or(DenoiseError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self
            .data
            .get(start..)
            .ok_or(DenoiseError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;

        ImageView::new(data, width, height, self.stride)
    }
}

impl ImageView<'_, f64> {
    /// Copies the view into a contiguous owned image.
    pub fn to_image(&self) -> Image {
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            data.extend_from_slice(row);
        }
        Image {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

impl ImageView<'_, u8> {
    /// Converts an 8-bit view into an owned `f64` image.
    pub fn to_image(&self) -> Image {
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            data.extend(row.iter().map(|&v| f64::from(v)));
        }
        Image {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

/// Owned contiguous grayscale image with `f64` intensities.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    data: Vec<f64>,
    width: usize,
    height: usize,
}

impl Image {
    /// Creates an image from a row-major buffer of exactly `width * height` values.
    pub fn new(data: Vec<f64>, width: usize, height: usize) -> DenoiseResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() < needed {
            return Err(DenoiseError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(DenoiseError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates an image with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: f64) -> DenoiseResult<Self> {
        let needed = required_len(width, height, width)?;
        Self::new(vec![value; needed], width, height)
    }

    /// Creates an image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> f64,
    ) -> DenoiseResult<Self> {
        let needed = required_len(width, height, width)?;
        let mut data = Vec::with_capacity(needed);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(data, width, height)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(height, width)`, rows first.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Returns the row-major pixel buffer.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Returns the row-major pixel buffer mutably.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consumes the image and returns its buffer.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Returns the pixel at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, f64> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns row `y` mutably.
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [f64]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.data.get_mut(start..start + self.width)
    }

    /// Applies `f` to every pixel, producing a new image of the same shape.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Image {
        Image {
            data: self.data.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Combines two same-shaped images pixel by pixel.
    pub fn zip_map(&self, other: &Image, f: impl Fn(f64, f64) -> f64) -> DenoiseResult<Image> {
        ensure_same_shape(self.shape(), other.shape())?;
        Ok(Image {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
            width: self.width,
            height: self.height,
        })
    }
}

/// Returns `ShapeMismatch` unless both `(height, width)` pairs agree.
pub(crate) fn ensure_same_shape(
    expected: (usize, usize),
    got: (usize, usize),
) -> DenoiseResult<()> {
    if expected != got {
        return Err(DenoiseError::ShapeMismatch { expected, got });
    }
    Ok(())
}

fn required_len(width: usize, height: usize, stride: usize) -> DenoiseResult<usize> {
    if width == 0 || height == 0 {
        return Err(DenoiseError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(DenoiseError::InvalidInput("stride smaller than width"));
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(DenoiseError::InvalidDimensions { width, height })?;
    Ok(needed)
}
