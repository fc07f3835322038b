//! Zero-mean, unit-variance normalization of whole images.

use crate::image::Image;
use crate::util::math::mean_std;
use crate::util::{DenoiseError, DenoiseResult};

/// Standardized image together with the statistics needed to undo it.
#[derive(Clone, Debug, PartialEq)]
pub struct Standardized {
    /// `(x - mean) / std` for every pixel.
    pub image: Image,
    /// Mean intensity of the original image.
    pub mean: f64,
    /// Population standard deviation of the original image.
    pub std: f64,
}

/// Standardizes `image` with its own mean and population std.
///
/// Constant images have no usable scale and return
/// [`DenoiseError::DegenerateImage`]; use [`standardize_or_center`] to
/// accept them.
pub fn standardize(image: &Image) -> DenoiseResult<Standardized> {
    match measure(image)? {
        (mean, Scale::Spread(std)) => Ok(Standardized {
            image: image.map(|v| (v - mean) / std),
            mean,
            std,
        }),
        (_, Scale::Flat) => Err(DenoiseError::DegenerateImage {
            reason: "zero variance",
        }),
    }
}

/// Like [`standardize`], but a constant image is only centered and its
/// recorded std is `1.0`, so [`reverse_standardize`] still inverts it.
/// Non-finite statistics are still an error.
pub fn standardize_or_center(image: &Image) -> DenoiseResult<Standardized> {
    match measure(image)? {
        (mean, Scale::Spread(std)) => Ok(Standardized {
            image: image.map(|v| (v - mean) / std),
            mean,
            std,
        }),
        (mean, Scale::Flat) => Ok(Standardized {
            image: image.map(|v| v - mean),
            mean,
            std: 1.0,
        }),
    }
}

/// Undoes standardization: `x * std + mean`.
pub fn reverse_standardize(image: &Image, mean: f64, std: f64) -> Image {
    image.map(|v| v * std + mean)
}

enum Scale {
    Spread(f64),
    Flat,
}

fn measure(image: &Image) -> DenoiseResult<(f64, Scale)> {
    let (mean, std) = mean_std(image.data());
    if !mean.is_finite() || !std.is_finite() {
        return Err(DenoiseError::DegenerateImage {
            reason: "non-finite statistics",
        });
    }
    if std <= 1e-12 * (1.0 + mean.abs()) {
        return Ok((mean, Scale::Flat));
    }
    Ok((mean, Scale::Spread(std)))
}
