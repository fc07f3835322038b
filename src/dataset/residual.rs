//! Residual images: the intensity lost between a clear image and its noisy
//! counterpart.

use crate::image::Image;
use crate::util::DenoiseResult;

/// Computes `floor(clip((clear - blurry) / 255, 0, 1) * 255)` per pixel.
///
/// Pixels where the noisy image is brighter than the clear one become 0.
pub fn residual_image(clear: &Image, blurry: &Image) -> DenoiseResult<Image> {
    clear.zip_map(blurry, |c, b| {
        let r = ((c - b) / 255.0).clamp(0.0, 1.0);
        (r * 255.0).floor()
    })
}

/// Writes `Residuals/<name>` for every clear/blurry pair of a set directory
/// and returns the number of residuals written.
///
/// Pairs are matched by name; clear images without a noisy counterpart are
/// skipped.
#[cfg(feature = "image-io")]
pub fn write_residuals(set_path: &std::path::Path) -> DenoiseResult<usize> {
    use crate::eval::{image_names, AssetKind};
    use crate::image::io::{load_gray_image, save_gray_image};
    use crate::trace::trace_event;

    let clear_dir = set_path.join(AssetKind::Clear.dir_name());
    let blurry_dir = set_path.join(AssetKind::Blurry.dir_name());
    let out_dir = set_path.join("Residuals");

    let mut written = 0;
    for name in image_names(&clear_dir)? {
        let blurry_path = blurry_dir.join(&name);
        if !blurry_path.is_file() {
            continue;
        }
        let clear = load_gray_image(clear_dir.join(&name))?;
        let blurry = load_gray_image(&blurry_path)?;
        save_gray_image(out_dir.join(&name), &residual_image(&clear, &blurry)?)?;
        written += 1;
    }
    trace_event!("residuals_written", count = written);
    Ok(written)
}
