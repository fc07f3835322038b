//! Destinations for individual denoised tiles.

use crate::image::Image;
use crate::util::DenoiseResult;
#[cfg(feature = "image-io")]
use std::path::PathBuf;

/// Per-image information handed to a [`PatchSink`].
#[derive(Clone, Debug, PartialEq)]
pub struct PatchContext {
    /// File name of the source image without extension.
    pub stem: String,
    /// Mean used to reverse-standardize tiles.
    pub mean: f64,
    /// Standard deviation used to reverse-standardize tiles.
    pub std: f64,
}

impl Default for PatchContext {
    fn default() -> Self {
        Self {
            stem: String::new(),
            mean: 0.0,
            std: 1.0,
        }
    }
}

/// Receives each denoised tile, already reverse-standardized.
pub trait PatchSink {
    fn save_patch(
        &mut self,
        ctx: &PatchContext,
        row: usize,
        col: usize,
        patch: &Image,
    ) -> DenoiseResult<()>;
}

/// Deterministic file name of the tile at `(row, col)`.
pub fn patch_file_name(stem: &str, row: usize, col: usize) -> String {
    format!("{stem}_i-{row}_j-{col}.png")
}

/// Writes tiles as 8-bit PNGs into `<set_dir>/<stem>_patches/`.
#[cfg(feature = "image-io")]
#[derive(Clone, Debug)]
pub struct DirectoryPatchSink {
    set_dir: PathBuf,
}

#[cfg(feature = "image-io")]
impl DirectoryPatchSink {
    /// Patch directories are created under `set_dir` on first write.
    pub fn new(set_dir: impl Into<PathBuf>) -> Self {
        Self {
            set_dir: set_dir.into(),
        }
    }
}

#[cfg(feature = "image-io")]
impl PatchSink for DirectoryPatchSink {
    fn save_patch(
        &mut self,
        ctx: &PatchContext,
        row: usize,
        col: usize,
        patch: &Image,
    ) -> DenoiseResult<()> {
        let path = self
            .set_dir
            .join(format!("{}_patches", ctx.stem))
            .join(patch_file_name(&ctx.stem, row, col));
        crate::image::io::save_gray_image(path, patch)
    }
}
