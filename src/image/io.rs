//! Convenience helpers for loading and saving images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{Image, ImageView};
use crate::util::{DenoiseError, DenoiseResult};
use std::path::Path;

/// Creates an owned `f64` image from a grayscale image buffer.
pub fn image_from_gray(img: &image::GrayImage) -> DenoiseResult<Image> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    Ok(ImageView::from_slice(img.as_raw(), width, height)?.to_image())
}

/// Converts to 8-bit grayscale, rounding and saturating each pixel.
pub fn gray_from_image(img: &Image) -> DenoiseResult<image::GrayImage> {
    let pixels: Vec<u8> = img.data().iter().map(|&v| saturate_u8(v)).collect();
    image::GrayImage::from_raw(img.width() as u32, img.height() as u32, pixels).ok_or(
        DenoiseError::BufferTooSmall {
            needed: img.width() * img.height(),
            got: img.data().len(),
        },
    )
}

/// Loads an image from disk and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> DenoiseResult<Image> {
    let img = image::open(path).map_err(|err| DenoiseError::ImageIo {
        reason: err.to_string(),
    })?;
    image_from_gray(&img.to_luma8())
}

/// Saves an image as 8-bit grayscale, creating the parent directory if needed.
pub fn save_gray_image<P: AsRef<Path>>(path: P, img: &Image) -> DenoiseResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| DenoiseError::io(parent, err))?;
        }
    }
    gray_from_image(img)?
        .save(path)
        .map_err(|err| DenoiseError::ImageIo {
            reason: err.to_string(),
        })
}

fn saturate_u8(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}
