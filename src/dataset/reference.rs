//! Sampling labelled reference patches from training pairs.
//!
//! Each clear/blurry pair is cut into overlapping windows. Every
//! `skip_every`-th window is kept, standardized with its image's
//! statistics, and labelled by the standard deviation of its residual.

use crate::image::{standardize_or_center, Image};
use crate::route::{NoiseCategory, ReferencePatchSet};
use crate::util::math::mean_std;
use crate::util::{DenoiseError, DenoiseResult};
use serde::{Deserialize, Serialize};

/// Window geometry and category thresholds for reference sampling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    /// Side of each square reference patch.
    pub patch_size: usize,
    /// Step between window origins.
    pub stride: usize,
    /// Keep one window out of this many.
    pub skip_every: usize,
    /// Residual std (on a 0..1 intensity scale) at or below which a patch is low noise.
    pub low_max: f64,
    /// Residual std at or below which a patch is medium noise.
    pub medium_max: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            patch_size: 40,
            stride: 20,
            skip_every: 3,
            low_max: 0.04,
            medium_max: 0.08,
        }
    }
}

impl SamplingConfig {
    fn validate(&self) -> DenoiseResult<()> {
        if self.patch_size == 0 || self.stride == 0 || self.skip_every == 0 {
            return Err(DenoiseError::InvalidInput(
                "patch size, stride and skip must be positive",
            ));
        }
        if !(self.low_max.is_finite() && self.medium_max.is_finite())
            || self.low_max > self.medium_max
        {
            return Err(DenoiseError::InvalidInput(
                "noise thresholds must be finite and ordered",
            ));
        }
        Ok(())
    }

    /// Category for a residual standard deviation.
    pub fn categorize(&self, residual_std: f64) -> NoiseCategory {
        if residual_std <= self.low_max {
            NoiseCategory::Low
        } else if residual_std <= self.medium_max {
            NoiseCategory::Medium
        } else {
            NoiseCategory::High
        }
    }
}

/// Builds a reference set from `(clear, blurry)` pairs in 8-bit intensity.
///
/// The window counter runs across all pairs, so `skip_every` thins the
/// combined stream rather than each image separately. Images smaller than
/// one patch contribute nothing.
pub fn sample_reference_patches<I>(
    pairs: I,
    cfg: &SamplingConfig,
) -> DenoiseResult<ReferencePatchSet>
where
    I: IntoIterator<Item = (Image, Image)>,
{
    cfg.validate()?;
    let size = cfg.patch_size;
    let mut set = ReferencePatchSet::new();
    let mut window = 0usize;
    let mut residual = Vec::with_capacity(size * size);

    for (clear, blurry) in pairs {
        crate::image::ensure_same_shape(clear.shape(), blurry.shape())?;
        if clear.width() < size || clear.height() < size {
            continue;
        }
        let standardized = standardize_or_center(&blurry)?.image;
        let clear_view = clear.view();
        let blurry_view = blurry.view();
        let std_view = standardized.view();

        for y in (0..=clear.height() - size).step_by(cfg.stride) {
            for x in (0..=clear.width() - size).step_by(cfg.stride) {
                let keep = window % cfg.skip_every == 0;
                window += 1;
                if !keep {
                    continue;
                }
                let c = clear_view.roi(x, y, size, size)?;
                let b = blurry_view.roi(x, y, size, size)?;
                residual.clear();
                for (crow, brow) in c.rows().zip(b.rows()) {
                    residual.extend(crow.iter().zip(brow).map(|(cv, bv)| (cv - bv) / 255.0));
                }
                let (_, std) = mean_std(&residual);
                let category = cfg.categorize(std);
                set.push(category, std_view.roi(x, y, size, size)?.to_image());
            }
        }
    }
    Ok(set)
}

/// Samples references from a training directory holding `ClearImages` and
/// `CoregisteredBlurryImages`.
#[cfg(feature = "image-io")]
pub fn load_reference_patches(
    train_dir: &std::path::Path,
    cfg: &SamplingConfig,
) -> DenoiseResult<ReferencePatchSet> {
    use crate::eval::{image_names, AssetKind};
    use crate::image::io::load_gray_image;
    use crate::trace::{trace_event, trace_span};

    let _span = trace_span!("load_reference_patches").entered();
    let clear_dir = train_dir.join(AssetKind::Clear.dir_name());
    let blurry_dir = train_dir.join(AssetKind::Blurry.dir_name());
    let mut pairs = Vec::new();
    for name in image_names(&blurry_dir)? {
        let clear_path = clear_dir.join(&name);
        if !clear_path.is_file() {
            return Err(DenoiseError::MissingAsset { path: clear_path });
        }
        pairs.push((load_gray_image(&clear_path)?, load_gray_image(blurry_dir.join(&name))?));
    }
    let set = sample_reference_patches(pairs, cfg)?;
    trace_event!(
        "references_sampled",
        low = set.patches(NoiseCategory::Low).len(),
        medium = set.patches(NoiseCategory::Medium).len(),
        high = set.patches(NoiseCategory::High).len(),
    );
    Ok(set)
}
