//! Masked quality evaluation of denoised (or still blurry) images.
//!
//! For every image of a dataset the clear image and the comparison image
//! are both multiplied by `floor(mask / 255)` before PSNR and SSIM are
//! computed, so only fully white mask pixels contribute.

mod assets;
mod report;

#[cfg(feature = "image-io")]
pub(crate) use assets::image_names;
pub use assets::{is_image_name, AssetKind, AssetResolver, DatasetLayout, MemoryAssets};
pub use report::{DatasetReport, ImageScore, PsnrAveraging};

use crate::image::{ensure_same_shape, Image};
use crate::metric::{psnr, ssim, SsimConfig};
use crate::trace::{trace_event, trace_span};
use crate::util::{DenoiseError, DenoiseResult};

/// Which image is compared with the clear ground truth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ComparisonSource {
    /// The denoised output stored in the result directory.
    #[default]
    Denoised,
    /// The original blurry input, as a baseline.
    Blurry,
}

impl ComparisonSource {
    /// Asset kind holding the comparison image.
    pub fn asset_kind(self) -> AssetKind {
        match self {
            ComparisonSource::Denoised => AssetKind::Denoised,
            ComparisonSource::Blurry => AssetKind::Blurry,
        }
    }
}

/// Evaluation settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalConfig {
    /// Dynamic range passed to PSNR.
    pub data_range: f64,
    /// SSIM settings.
    pub ssim: SsimConfig,
    /// Store the masked comparison image back as the denoised result.
    pub write_masked: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            data_range: 255.0,
            ssim: SsimConfig::u8_range(),
            write_masked: false,
        }
    }
}

/// Multiplies `image` by `floor(mask / 255)`.
pub fn apply_mask(image: &Image, mask: &Image) -> DenoiseResult<Image> {
    ensure_same_shape(image.shape(), mask.shape())?;
    image.zip_map(mask, |v, m| v * (m / 255.0).floor())
}

/// Scores one clear/comparison pair after masking both.
pub fn score_masked(
    clear: &Image,
    comparison: &Image,
    mask: &Image,
    cfg: &EvalConfig,
) -> DenoiseResult<(Image, f64, f64)> {
    let comparison = apply_mask(comparison, mask)?;
    let clear = apply_mask(clear, mask)?;
    let psnr = psnr(&clear, &comparison, cfg.data_range)?;
    let ssim = ssim(&clear, &comparison, &cfg.ssim)?;
    Ok((comparison, psnr, ssim))
}

/// Evaluates every image of `set_name` against its clear image and mask.
///
/// A missing clear image, mask, or comparison image aborts the evaluation
/// with [`DenoiseError::MissingAsset`].
pub fn evaluate_dataset(
    set_name: &str,
    assets: &dyn AssetResolver,
    source: ComparisonSource,
    cfg: &EvalConfig,
) -> DenoiseResult<DatasetReport> {
    let _span = trace_span!("evaluate_dataset", set = set_name).entered();
    let comparison_kind = source.asset_kind();
    let mut report = DatasetReport::new(set_name);
    for name in assets.list_images(set_name)? {
        for kind in [AssetKind::Clear, AssetKind::Mask, comparison_kind] {
            if !assets.exists(set_name, kind, &name) {
                return Err(DenoiseError::MissingAsset {
                    path: assets.locate(set_name, kind, &name),
                });
            }
        }
        let mask = assets.load(set_name, AssetKind::Mask, &name)?;
        let clear = assets.load(set_name, AssetKind::Clear, &name)?;
        let comparison = assets.load(set_name, comparison_kind, &name)?;

        let (masked, psnr, ssim) = score_masked(&clear, &comparison, &mask, cfg)?;
        if cfg.write_masked {
            assets.store(set_name, AssetKind::Denoised, &name, &masked)?;
        }
        report.push(ImageScore { name, psnr, ssim });
    }
    trace_event!(
        "dataset_evaluated",
        images = report.len(),
        psnr_avg = report.psnr_avg(),
        ssim_avg = report.ssim_avg()
    );
    Ok(report)
}
