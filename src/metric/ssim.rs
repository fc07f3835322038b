//! Structural similarity with reusable per-image window statistics.

use crate::image::{ensure_same_shape, Image};
use crate::util::math::{box_sum, integral};
use crate::util::{DenoiseError, DenoiseResult};

/// Parameters of the SSIM computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SsimConfig {
    /// Side length of the uniform window (odd, at least 3).
    pub win_size: usize,
    /// Dynamic range of the pixel values.
    pub data_range: f64,
    /// Luminance stabilization constant.
    pub k1: f64,
    /// Contrast stabilization constant.
    pub k2: f64,
}

impl SsimConfig {
    /// Settings for 8-bit intensities.
    pub fn u8_range() -> Self {
        Self {
            data_range: 255.0,
            ..Self::default()
        }
    }

    /// Settings for standardized floating point patches, whose nominal
    /// range is `[-1, 1]`.
    pub fn standardized() -> Self {
        Self {
            data_range: 2.0,
            ..Self::default()
        }
    }

    fn validate(&self) -> DenoiseResult<()> {
        if self.win_size < 3 || self.win_size % 2 == 0 {
            return Err(DenoiseError::InvalidInput("win_size must be odd and >= 3"));
        }
        if !(self.data_range > 0.0) {
            return Err(DenoiseError::InvalidInput("data_range must be positive"));
        }
        Ok(())
    }
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            win_size: 7,
            data_range: 255.0,
            k1: 0.01,
            k2: 0.03,
        }
    }
}

/// Precomputed window means and variances of one image.
///
/// Building a plan costs one pass over the image; comparing two plans only
/// needs the cross term. Reference patches used for routing are planned once
/// per run and compared against every query patch.
#[derive(Clone, Debug)]
pub struct SsimPlan {
    cfg: SsimConfig,
    width: usize,
    height: usize,
    values: Vec<f64>,
    means: Vec<f64>,
    vars: Vec<f64>,
}

impl SsimPlan {
    /// Builds window statistics for `image`.
    pub fn new(image: &Image, cfg: SsimConfig) -> DenoiseResult<Self> {
        cfg.validate()?;
        let (width, height) = (image.width(), image.height());
        if width < cfg.win_size || height < cfg.win_size {
            return Err(DenoiseError::InvalidInput("image smaller than SSIM window"));
        }
        let values = image.data().to_vec();
        let squares: Vec<f64> = values.iter().map(|v| v * v).collect();
        let sum_table = integral(&values, width, height);
        let sq_table = integral(&squares, width, height);

        let win = cfg.win_size;
        let np = (win * win) as f64;
        let cov_norm = np / (np - 1.0);
        let (out_w, out_h) = (width - win + 1, height - win + 1);
        let mut means = Vec::with_capacity(out_w * out_h);
        let mut vars = Vec::with_capacity(out_w * out_h);
        for y in 0..out_h {
            for x in 0..out_w {
                let mean = box_sum(&sum_table, width, x, y, win) / np;
                let mean_sq = box_sum(&sq_table, width, x, y, win) / np;
                means.push(mean);
                vars.push(cov_norm * (mean_sq - mean * mean));
            }
        }

        Ok(Self {
            cfg,
            width,
            height,
            values,
            means,
            vars,
        })
    }

    /// Returns `(height, width)` of the planned image.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Mean SSIM between the two planned images.
    pub fn compare(&self, other: &SsimPlan) -> DenoiseResult<f64> {
        ensure_same_shape(self.shape(), other.shape())?;
        if self.cfg != other.cfg {
            return Err(DenoiseError::InvalidInput("SSIM plans use different settings"));
        }
        let (width, height) = (self.width, self.height);
        let products: Vec<f64> = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a * b)
            .collect();
        let cross_table = integral(&products, width, height);

        let win = self.cfg.win_size;
        let np = (win * win) as f64;
        let cov_norm = np / (np - 1.0);
        let c1 = (self.cfg.k1 * self.cfg.data_range).powi(2);
        let c2 = (self.cfg.k2 * self.cfg.data_range).powi(2);
        let out_w = width - win + 1;

        let mut total = 0.0f64;
        for (idx, ((&ux, &vx), (&uy, &vy))) in self
            .means
            .iter()
            .zip(&self.vars)
            .zip(other.means.iter().zip(&other.vars))
            .enumerate()
        {
            let (x, y) = (idx % out_w, idx / out_w);
            let uxy = box_sum(&cross_table, width, x, y, win) / np;
            let vxy = cov_norm * (uxy - ux * uy);
            let num = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let den = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            total += num / den;
        }
        Ok(total / self.means.len() as f64)
    }

    /// Mean SSIM between the planned image and `image`.
    pub fn score(&self, image: &Image) -> DenoiseResult<f64> {
        self.compare(&SsimPlan::new(image, self.cfg)?)
    }
}

/// Mean SSIM between two same-shaped images.
pub fn ssim(a: &Image, b: &Image, cfg: &SsimConfig) -> DenoiseResult<f64> {
    ensure_same_shape(a.shape(), b.shape())?;
    SsimPlan::new(a, *cfg)?.score(b)
}
