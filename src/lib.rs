//! HydraDenoise is a patch-based image denoising library with noise-aware
//! model routing.
//!
//! Images are standardized, cut into square tiles, and each tile is denoised
//! either by one general model or by a low, medium, or high noise specialist
//! chosen by SSIM similarity to labelled reference patches. Results are scored
//! with masked PSNR and SSIM. Tile inference can run in parallel via the
//! `rayon` feature.

pub mod dataset;
pub mod eval;
pub mod image;
pub mod metric;
pub mod model;
pub mod pipeline;
pub mod route;
pub mod tile;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use image::io;
pub use image::{
    reverse_standardize, standardize, standardize_or_center, Image, ImageView, Standardized,
};
pub use util::{DenoiseError, DenoiseResult};

pub use dataset::{
    clahe, plan_split, residual_image, sample_reference_patches, ClaheConfig, SamplingConfig,
    SplitPlan,
};
pub use eval::{
    evaluate_dataset, AssetKind, AssetResolver, ComparisonSource, DatasetLayout, DatasetReport,
    EvalConfig,
};
pub use metric::{psnr, ssim, SsimConfig};
pub use model::{
    DenoiseMode, Denoiser, JsonCheckpointLoader, ModelBank, ModelKey, ModelLoader, ModelPaths,
};
pub use pipeline::{DenoiseConfig, InferenceRun, PatchDenoiser, RunConfig};
pub use route::{CategoryCounts, CategoryRouter, NoiseCategory, ReferencePatchSet};
pub use tile::{iter_tiles, write_tile, Tile, TileGrid};
