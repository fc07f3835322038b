//! Dataset-level inference: denoise every image of a set and score it.

use crate::eval::{
    AssetKind, AssetResolver, DatasetReport, EvalConfig, ImageScore, PsnrAveraging,
};
use crate::image::{reverse_standardize, standardize_or_center};
use crate::metric::{psnr, ssim};
use crate::pipeline::{PatchContext, PatchDenoiser, PatchSink};
use crate::route::CategoryCounts;
use crate::trace::{trace_event, trace_span};
use crate::util::{DenoiseError, DenoiseResult};
use std::path::Path;
use std::time::Instant;

/// Output settings of a batch run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunConfig {
    /// Store denoised images and the per-set results table.
    pub save_result: bool,
    /// Scoring settings for the unmasked comparison.
    pub eval: EvalConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            save_result: true,
            eval: EvalConfig::default(),
        }
    }
}

/// Result of denoising one set.
#[derive(Clone, Debug, PartialEq)]
pub struct SetOutcome {
    /// Unmasked scores of the denoised images.
    pub report: DatasetReport,
    /// Patches routed per category while denoising this set.
    pub counts: CategoryCounts,
}

/// Denoises whole datasets with one [`PatchDenoiser`].
pub struct InferenceRun<'a> {
    denoiser: PatchDenoiser<'a>,
    cfg: RunConfig,
}

impl<'a> InferenceRun<'a> {
    /// Creates a run.
    pub fn new(denoiser: PatchDenoiser<'a>, cfg: RunConfig) -> Self {
        Self { denoiser, cfg }
    }

    /// Denoises every image of `set` and scores it against its clear image.
    ///
    /// Both clear and blurry images are standardized with their own
    /// statistics; the prediction is mapped back with the clear image's
    /// statistics so it is directly comparable with the ground truth.
    pub fn run_set(
        &self,
        set: &str,
        assets: &dyn AssetResolver,
        mut sink: Option<&mut (dyn PatchSink + '_)>,
    ) -> DenoiseResult<SetOutcome> {
        let _span = trace_span!("run_set", set = set).entered();
        let mut report = DatasetReport::with_averaging(set, PsnrAveraging::All);
        let mut counts = CategoryCounts::new();

        for name in assets.list_images(set)? {
            if !assets.exists(set, AssetKind::Clear, &name) {
                return Err(DenoiseError::MissingAsset {
                    path: assets.locate(set, AssetKind::Clear, &name),
                });
            }
            let clear = standardize_or_center(&assets.load(set, AssetKind::Clear, &name)?)?;
            let blurry = standardize_or_center(&assets.load(set, AssetKind::Blurry, &name)?)?;
            let ctx = PatchContext {
                stem: file_stem(&name),
                mean: clear.mean,
                std: clear.std,
            };

            let start = Instant::now();
            let predicted =
                self.denoiser
                    .denoise_image(&blurry.image, &mut counts, sink.as_deref_mut(), &ctx)?;
            trace_event!(
                "image_denoised",
                image = name.as_str(),
                seconds = start.elapsed().as_secs_f64()
            );

            let truth = reverse_standardize(&clear.image, clear.mean, clear.std);
            let predicted = reverse_standardize(&predicted, clear.mean, clear.std);
            let psnr = psnr(&truth, &predicted, self.cfg.eval.data_range)?;
            let ssim = ssim(&truth, &predicted, &self.cfg.eval.ssim)?;

            if self.cfg.save_result {
                assets.store(set, AssetKind::Denoised, &name, &predicted)?;
            }
            report.push(ImageScore { name, psnr, ssim });
        }

        if self.cfg.save_result {
            assets.store_report(set, &report)?;
        }
        Ok(SetOutcome { report, counts })
    }
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
        .to_string()
}
