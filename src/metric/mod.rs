//! Image quality metrics: PSNR and mean SSIM.
//!
//! SSIM uses a uniform `win_size x win_size` window evaluated at every
//! placement that fits inside the image, the sample covariance
//! normalization `N / (N - 1)`, and the usual constants `K1 = 0.01`,
//! `K2 = 0.03`. The result is the mean of the local SSIM map.

mod ssim;

pub use ssim::{ssim, SsimConfig, SsimPlan};

use crate::image::{ensure_same_shape, Image};
use crate::util::{DenoiseError, DenoiseResult};

/// Peak signal-to-noise ratio in dB between `reference` and `test`.
///
/// Returns `+inf` for identical images.
pub fn psnr(reference: &Image, test: &Image, data_range: f64) -> DenoiseResult<f64> {
    ensure_same_shape(reference.shape(), test.shape())?;
    if !(data_range > 0.0) {
        return Err(DenoiseError::InvalidInput("data_range must be positive"));
    }
    let mse = mean_squared_error(reference, test)?;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(10.0 * (data_range * data_range / mse).log10())
}

/// Mean squared error over all pixels.
pub fn mean_squared_error(reference: &Image, test: &Image) -> DenoiseResult<f64> {
    ensure_same_shape(reference.shape(), test.shape())?;
    let sum: f64 = reference
        .data()
        .iter()
        .zip(test.data())
        .map(|(&a, &b)| {
            let d = a - b;
            d * d
        })
        .sum();
    Ok(sum / reference.data().len() as f64)
}
