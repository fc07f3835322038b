//! Intensity normalization of training pairs: contrast-limited adaptive
//! histogram equalization (CLAHE) of clear images, and histogram matching of
//! each noisy image to its clear counterpart.
//!
//! Matching goes through `imageproc::contrast::match_histogram` and needs the
//! `image-io` feature. CLAHE works on any [`Image`] whose values are on the
//! 8-bit scale.

use crate::image::Image;
use crate::util::{DenoiseError, DenoiseResult};
use serde::{Deserialize, Serialize};

const LEVELS: usize = 256;

/// Parameters of [`clahe`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClaheConfig {
    /// Histogram clip limit relative to a flat histogram of the tile.
    pub clip_limit: f64,
    /// Tiles per axis; reduced to the image size on tiny images.
    pub tiles: usize,
}

impl Default for ClaheConfig {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tiles: 8,
        }
    }
}

impl ClaheConfig {
    fn validate(&self) -> DenoiseResult<()> {
        if self.tiles == 0 {
            return Err(DenoiseError::InvalidInput("clahe tiles must be positive"));
        }
        if !(self.clip_limit.is_finite() && self.clip_limit > 0.0) {
            return Err(DenoiseError::InvalidInput(
                "clahe clip limit must be positive and finite",
            ));
        }
        Ok(())
    }
}

/// Equalizes `image` tile by tile with clipped histograms, blending the
/// per-tile lookup tables bilinearly between tile centers.
///
/// Input values are rounded and clamped to `0..=255`; the output is integral
/// in the same range.
pub fn clahe(image: &Image, config: &ClaheConfig) -> DenoiseResult<Image> {
    config.validate()?;
    let (width, height) = image.shape();
    let tiles_x = config.tiles.min(width);
    let tiles_y = config.tiles.min(height);
    let levels: Vec<usize> = image.data().iter().map(|&v| level(v)).collect();

    let x_bounds = tile_bounds(width, tiles_x);
    let y_bounds = tile_bounds(height, tiles_y);
    let mut luts = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0usize; LEVELS];
            for y in y_bounds[ty]..y_bounds[ty + 1] {
                let row = &levels[y * width..(y + 1) * width];
                for &v in &row[x_bounds[tx]..x_bounds[tx + 1]] {
                    hist[v] += 1;
                }
            }
            let area = (x_bounds[tx + 1] - x_bounds[tx]) * (y_bounds[ty + 1] - y_bounds[ty]);
            luts.push(tile_lut(&mut hist, area, config.clip_limit));
        }
    }

    let tile_w = width as f64 / tiles_x as f64;
    let tile_h = height as f64 / tiles_y as f64;
    Image::from_fn(width, height, |x, y| {
        let (x0, x1, ax) = neighbours(x, tile_w, tiles_x);
        let (y0, y1, ay) = neighbours(y, tile_h, tiles_y);
        let v = levels[y * width + x];
        let at = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v];
        let top = (1.0 - ax) * at(x0, y0) + ax * at(x1, y0);
        let bottom = (1.0 - ax) * at(x0, y1) + ax * at(x1, y1);
        ((1.0 - ay) * top + ay * bottom).round()
    })
}

fn level(value: f64) -> usize {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as usize
}

fn tile_bounds(len: usize, tiles: usize) -> Vec<usize> {
    (0..=tiles).map(|i| i * len / tiles).collect()
}

/// Clips `hist`, spreads the excess over all levels, and returns the
/// equalizing lookup table.
fn tile_lut(hist: &mut [usize; LEVELS], area: usize, clip_limit: f64) -> [f64; LEVELS] {
    let clip = ((clip_limit * area as f64 / LEVELS as f64) as usize).max(1);
    let mut excess = 0;
    for count in hist.iter_mut() {
        if *count > clip {
            excess += *count - clip;
            *count = clip;
        }
    }
    let per_level = excess / LEVELS;
    let remainder = excess % LEVELS;
    for count in hist.iter_mut() {
        *count += per_level;
    }
    if remainder > 0 {
        let step = (LEVELS / remainder).max(1);
        for i in 0..remainder {
            hist[i * step] += 1;
        }
    }

    let mut lut = [0.0; LEVELS];
    let mut cdf = 0;
    for (slot, &count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *slot = (cdf as f64 * 255.0 / area as f64).round();
    }
    lut
}

/// Tile indices on either side of pixel `p` and the weight of the second.
fn neighbours(p: usize, tile_len: f64, tiles: usize) -> (usize, usize, f64) {
    let pos = (p as f64 + 0.5) / tile_len - 0.5;
    if pos <= 0.0 {
        return (0, 0, 0.0);
    }
    let lo = pos.floor() as usize;
    if lo + 1 >= tiles {
        return (tiles - 1, tiles - 1, 0.0);
    }
    (lo, lo + 1, pos - lo as f64)
}

/// Remaps `source` so its intensity histogram follows `reference`.
///
/// Both images are taken on the 8-bit scale; shapes may differ.
#[cfg(feature = "image-io")]
pub fn match_histogram(source: &Image, reference: &Image) -> DenoiseResult<Image> {
    use crate::image::io::{gray_from_image, image_from_gray};

    let matched = imageproc::contrast::match_histogram(
        &gray_from_image(source)?,
        &gray_from_image(reference)?,
    );
    image_from_gray(&matched)
}

/// Normalizes a set directory in place: applies CLAHE to each clear image
/// when `clahe_config` is given, then matches the noisy image of the same name
/// to it.
///
/// Returns the number of matched pairs. Clear images without a noisy
/// counterpart are still equalized.
#[cfg(feature = "image-io")]
pub fn normalize_split(
    set_path: &std::path::Path,
    clahe_config: Option<&ClaheConfig>,
) -> DenoiseResult<usize> {
    use crate::eval::{image_names, AssetKind};
    use crate::image::io::{load_gray_image, save_gray_image};
    use crate::trace::trace_event;

    let clear_dir = set_path.join(AssetKind::Clear.dir_name());
    let blurry_dir = set_path.join(AssetKind::Blurry.dir_name());

    let mut matched = 0;
    for name in image_names(&clear_dir)? {
        let clear_path = clear_dir.join(&name);
        let mut clear = load_gray_image(&clear_path)?;
        if let Some(config) = clahe_config {
            clear = clahe(&clear, config)?;
            save_gray_image(&clear_path, &clear)?;
        }
        let blurry_path = blurry_dir.join(&name);
        if !blurry_path.is_file() {
            continue;
        }
        let blurry = load_gray_image(&blurry_path)?;
        save_gray_image(&blurry_path, &match_histogram(&blurry, &clear)?)?;
        matched += 1;
    }
    trace_event!("split_normalized", matched = matched);
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(img: &Image) -> f64 {
        let max = img.data().iter().cloned().fold(f64::MIN, f64::max);
        let min = img.data().iter().cloned().fold(f64::MAX, f64::min);
        max - min
    }

    #[test]
    fn single_tile_without_clipping_is_global_equalization() {
        let data = [10.0, 20.0].repeat(8);
        let img = Image::new(data, 4, 4).unwrap();
        let config = ClaheConfig {
            clip_limit: 1000.0,
            tiles: 1,
        };
        let out = clahe(&img, &config).unwrap();
        for (&src, &dst) in img.data().iter().zip(out.data()) {
            assert_eq!(dst, if src == 10.0 { 128.0 } else { 255.0 });
        }
    }

    #[test]
    fn clip_limit_bounds_contrast_gain() {
        let data = [10.0, 20.0].repeat(8);
        let img = Image::new(data, 4, 4).unwrap();
        let config = ClaheConfig {
            clip_limit: 2.0,
            tiles: 1,
        };
        let out = clahe(&img, &config).unwrap();
        assert_eq!(out.get(0, 0), Some(32.0));
        assert_eq!(out.get(1, 0), Some(64.0));
    }

    #[test]
    fn low_contrast_ramp_is_widened_within_range() {
        let img = Image::from_fn(16, 16, |x, _| 100.0 + x as f64).unwrap();
        let config = ClaheConfig {
            clip_limit: 2.0,
            tiles: 2,
        };
        let out = clahe(&img, &config).unwrap();
        assert!(out.data().iter().all(|&v| (0.0..=255.0).contains(&v)));
        assert!(spread(&out) > 2.0 * spread(&img));
    }

    #[test]
    fn tiles_shrink_to_tiny_images() {
        let img = Image::from_fn(3, 2, |x, y| (x * 40 + y * 90) as f64).unwrap();
        let out = clahe(&img, &ClaheConfig::default()).unwrap();
        assert_eq!(out.shape(), (3, 2));
    }

    #[test]
    fn invalid_clahe_config_is_rejected() {
        let img = Image::filled(4, 4, 1.0).unwrap();
        let zero_tiles = ClaheConfig {
            tiles: 0,
            ..ClaheConfig::default()
        };
        assert!(matches!(
            clahe(&img, &zero_tiles),
            Err(DenoiseError::InvalidInput(_))
        ));
        let bad_clip = ClaheConfig {
            clip_limit: 0.0,
            ..ClaheConfig::default()
        };
        assert!(matches!(
            clahe(&img, &bad_clip),
            Err(DenoiseError::InvalidInput(_))
        ));
    }

    #[cfg(feature = "image-io")]
    fn cdf(img: &Image) -> Vec<f64> {
        let mut hist = [0usize; LEVELS];
        for &v in img.data() {
            hist[level(v)] += 1;
        }
        let total = img.data().len() as f64;
        let mut acc = 0;
        hist.iter()
            .map(|&c| {
                acc += c;
                acc as f64 / total
            })
            .collect()
    }

    #[cfg(feature = "image-io")]
    #[test]
    fn matched_histogram_follows_reference_cdf() {
        let source = Image::from_fn(64, 64, |x, y| ((x + y * 64) % 256) as f64).unwrap();
        let reference = Image::from_fn(64, 64, |x, y| (60 + (x + y * 64) % 128) as f64).unwrap();
        let matched = match_histogram(&source, &reference).unwrap();

        assert_eq!(matched.shape(), source.shape());
        assert!(matched.data().iter().all(|&v| (60.0..=187.0).contains(&v)));
        let max_gap = cdf(&matched)
            .iter()
            .zip(cdf(&reference))
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(max_gap < 0.02, "cdf gap {max_gap}");
    }

    #[cfg(feature = "image-io")]
    #[test]
    fn matching_to_itself_is_identity() {
        let img = Image::from_fn(32, 16, |x, y| ((x * 7 + y * 13) % 256) as f64).unwrap();
        assert_eq!(match_histogram(&img, &img).unwrap(), img);
    }

    #[cfg(feature = "image-io")]
    #[test]
    fn split_normalization_rewrites_noisy_images() {
        use crate::image::io::{load_gray_image, save_gray_image};

        let dir = tempfile::tempdir().unwrap();
        let clear = Image::from_fn(32, 32, |x, y| (60 + (x + y * 32) % 128) as f64).unwrap();
        let blurry = Image::from_fn(32, 32, |x, y| ((x + y * 32) % 256) as f64).unwrap();
        save_gray_image(dir.path().join("ClearImages/a.png"), &clear).unwrap();
        save_gray_image(dir.path().join("CoregisteredBlurryImages/a.png"), &blurry).unwrap();
        save_gray_image(dir.path().join("ClearImages/b.png"), &clear).unwrap();

        assert_eq!(normalize_split(dir.path(), None).unwrap(), 1);
        let rewritten =
            load_gray_image(dir.path().join("CoregisteredBlurryImages/a.png")).unwrap();
        assert!(rewritten.data().iter().all(|&v| (60.0..=187.0).contains(&v)));
        let kept = load_gray_image(dir.path().join("ClearImages/a.png")).unwrap();
        assert_eq!(kept, clear);
    }
}
