//! Patch-wise denoising of whole images.
//!
//! [`PatchDenoiser`] tiles an image, picks a model per tile (always `All` in
//! single mode, the routed specialist in multi mode), runs it, and writes the
//! result back into a copy of the input. Pixels outside full tiles keep their
//! input values.

pub mod batch;
mod sink;

pub use batch::{InferenceRun, RunConfig, SetOutcome};
pub use sink::{patch_file_name, PatchContext, PatchSink};
#[cfg(feature = "image-io")]
pub use sink::DirectoryPatchSink;

use crate::image::{reverse_standardize, Image};
pub use crate::model::DenoiseMode;
use crate::model::{ModelBank, ModelKey};
use crate::route::{CategoryCounts, CategoryRouter, NoiseCategory};
use crate::tile::{iter_tiles, write_tile, Tile};
use crate::trace::{trace_debug, trace_span};
use crate::util::{DenoiseError, DenoiseResult};

/// Settings of the patch-wise denoiser.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DenoiseConfig {
    /// Edge length of the square tiles.
    pub tile_size: usize,
    /// Single model or routed specialists.
    pub mode: DenoiseMode,
    /// Route and infer the tiles of one image in parallel (`rayon` feature).
    pub parallel: bool,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            tile_size: 40,
            mode: DenoiseMode::Single,
            parallel: false,
        }
    }
}

/// Denoiser composing the tiler, the router, and the model bank.
pub struct PatchDenoiser<'a> {
    bank: &'a ModelBank,
    router: Option<&'a CategoryRouter>,
    cfg: DenoiseConfig,
}

impl<'a> PatchDenoiser<'a> {
    /// Checks that the bank holds every model `cfg.mode` needs and that a
    /// router is present in multi mode.
    pub fn new(
        bank: &'a ModelBank,
        router: Option<&'a CategoryRouter>,
        cfg: DenoiseConfig,
    ) -> DenoiseResult<Self> {
        if cfg.tile_size == 0 {
            return Err(DenoiseError::InvalidInput("tile_size must be at least 1"));
        }
        bank.ensure_ready(cfg.mode)?;
        if cfg.mode == DenoiseMode::Multi && router.is_none() {
            return Err(DenoiseError::InvalidInput(
                "multi-model mode requires reference patches",
            ));
        }
        Ok(Self { bank, router, cfg })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DenoiseConfig {
        &self.cfg
    }

    /// Denoises `noisy` tile by tile.
    ///
    /// In multi mode every routed tile increments `counts`. When `sink` is
    /// given, each denoised tile is reverse-standardized with the statistics
    /// in `ctx` and handed to it in raster order.
    pub fn denoise_image(
        &self,
        noisy: &Image,
        counts: &mut CategoryCounts,
        mut sink: Option<&mut (dyn PatchSink + '_)>,
        ctx: &PatchContext,
    ) -> DenoiseResult<Image> {
        let _span = trace_span!(
            "denoise_image",
            width = noisy.width(),
            height = noisy.height(),
            tile_size = self.cfg.tile_size
        )
        .entered();

        let mut output = noisy.clone();
        for (tile, category, denoised) in self.process_tiles(noisy)? {
            if let Some(category) = category {
                counts.increment(category);
            }
            write_tile(&mut output, tile.row, tile.col, self.cfg.tile_size, &denoised);
            if let Some(sink) = sink.as_deref_mut() {
                let restored = reverse_standardize(&denoised, ctx.mean, ctx.std);
                sink.save_patch(ctx, tile.row, tile.col, &restored)?;
            }
        }
        Ok(output)
    }

    fn process_tiles(
        &self,
        noisy: &Image,
    ) -> DenoiseResult<Vec<(Tile, Option<NoiseCategory>, Image)>> {
        let tiles = iter_tiles(noisy, self.cfg.tile_size)?;
        if self.cfg.parallel {
            return self.process_tiles_par(tiles.collect());
        }
        tiles.map(|tile| self.process_tile(tile)).collect()
    }

    #[cfg(feature = "rayon")]
    fn process_tiles_par(
        &self,
        tiles: Vec<Tile>,
    ) -> DenoiseResult<Vec<(Tile, Option<NoiseCategory>, Image)>> {
        use rayon::prelude::*;
        tiles
            .into_par_iter()
            .map(|tile| self.process_tile(tile))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn process_tiles_par(
        &self,
        tiles: Vec<Tile>,
    ) -> DenoiseResult<Vec<(Tile, Option<NoiseCategory>, Image)>> {
        tiles
            .into_iter()
            .map(|tile| self.process_tile(tile))
            .collect()
    }

    fn process_tile(&self, tile: Tile) -> DenoiseResult<(Tile, Option<NoiseCategory>, Image)> {
        let (key, category) = match (self.cfg.mode, self.router) {
            (DenoiseMode::Multi, Some(router)) => {
                let routing = router.select_category(&tile.patch)?;
                trace_debug!(
                    "patch_routed",
                    row = tile.row,
                    col = tile.col,
                    category = routing.category.as_str(),
                    score = routing.score
                );
                (routing.category.model_key(), Some(routing.category))
            }
            _ => (ModelKey::All, None),
        };
        let denoised = self.bank.infer(key, &tile.patch)?;
        Ok((tile, category, denoised))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageView;
    use crate::metric::SsimConfig;
    use crate::model::IdentityDenoiser;
    use crate::route::ReferencePatchSet;

    fn noisy(width: usize, height: usize) -> Image {
        Image::from_fn(width, height, |x, y| (((x * 37) ^ (y * 11)) % 50) as f64 - 25.0).unwrap()
    }

    fn constant_model(value: f64) -> Box<dyn crate::model::Denoiser> {
        Box::new(move |patch: ImageView<'_, f64>| {
            Image::filled(patch.width(), patch.height(), value)
        })
    }

    #[test]
    fn identity_model_returns_input() {
        let bank = ModelBank::new().with_model(ModelKey::All, Box::new(IdentityDenoiser));
        let denoiser = PatchDenoiser::new(&bank, None, DenoiseConfig::default()).unwrap();
        let image = noisy(80, 80);
        let mut counts = CategoryCounts::new();
        let out = denoiser
            .denoise_image(&image, &mut counts, None, &PatchContext::default())
            .unwrap();
        assert_eq!(out, image);
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn edge_strips_keep_input_values() {
        let bank = ModelBank::new().with_model(ModelKey::All, constant_model(1000.0));
        let cfg = DenoiseConfig {
            tile_size: 4,
            ..DenoiseConfig::default()
        };
        let denoiser = PatchDenoiser::new(&bank, None, cfg).unwrap();
        let image = noisy(10, 7);
        let out = denoiser
            .denoise_image(&image, &mut CategoryCounts::new(), None, &PatchContext::default())
            .unwrap();
        for y in 0..7 {
            for x in 0..10 {
                let covered = x < 8 && y < 4;
                let expected = if covered { 1000.0 } else { image.get(x, y).unwrap() };
                assert_eq!(out.get(x, y).unwrap(), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn multi_mode_routes_and_counts() {
        let image = noisy(24, 16);
        let tiles: Vec<Tile> = iter_tiles(&image, 8).unwrap().collect();
        let mut refs = ReferencePatchSet::new();
        refs.push(NoiseCategory::High, tiles[0].patch.clone());
        refs.push(NoiseCategory::Low, tiles[4].patch.clone());
        let router = CategoryRouter::new(&refs, SsimConfig::standardized()).unwrap();

        let bank = ModelBank::new()
            .with_model(ModelKey::All, constant_model(0.0))
            .with_model(ModelKey::Low, constant_model(1.0))
            .with_model(ModelKey::Medium, constant_model(2.0))
            .with_model(ModelKey::High, constant_model(3.0));
        let cfg = DenoiseConfig {
            tile_size: 8,
            mode: DenoiseMode::Multi,
            parallel: false,
        };
        let denoiser = PatchDenoiser::new(&bank, Some(&router), cfg).unwrap();
        let mut counts = CategoryCounts::new();
        let out = denoiser
            .denoise_image(&image, &mut counts, None, &PatchContext::default())
            .unwrap();
        assert_eq!(counts.total(), 6);
        assert_eq!(out.get(0, 0), Some(3.0));
        assert_eq!(out.get(8, 8), Some(1.0));
    }

    #[test]
    fn multi_mode_requires_router_and_models() {
        let bank = ModelBank::new().with_model(ModelKey::All, Box::new(IdentityDenoiser));
        let cfg = DenoiseConfig {
            mode: DenoiseMode::Multi,
            ..DenoiseConfig::default()
        };
        assert!(matches!(
            PatchDenoiser::new(&bank, None, cfg),
            Err(DenoiseError::ModelLoad { key: ModelKey::Low, .. })
        ));
    }

    #[derive(Default)]
    struct Collect(Vec<(usize, usize, Image)>);

    impl PatchSink for Collect {
        fn save_patch(
            &mut self,
            _ctx: &PatchContext,
            row: usize,
            col: usize,
            patch: &Image,
        ) -> DenoiseResult<()> {
            self.0.push((row, col, patch.clone()));
            Ok(())
        }
    }

    #[test]
    fn sink_receives_reverse_standardized_tiles_in_raster_order() {
        let bank = ModelBank::new().with_model(ModelKey::All, constant_model(1.0));
        let cfg = DenoiseConfig {
            tile_size: 5,
            ..DenoiseConfig::default()
        };
        let denoiser = PatchDenoiser::new(&bank, None, cfg).unwrap();
        let ctx = PatchContext {
            stem: "img".to_string(),
            mean: 100.0,
            std: 10.0,
        };
        let mut sink = Collect::default();
        denoiser
            .denoise_image(&noisy(10, 11), &mut CategoryCounts::new(), Some(&mut sink), &ctx)
            .unwrap();
        let offsets: Vec<(usize, usize)> = sink.0.iter().map(|(r, c, _)| (*r, *c)).collect();
        assert_eq!(offsets, vec![(0, 0), (0, 5), (5, 0), (5, 5)]);
        assert!(sink.0.iter().all(|(_, _, p)| p.data().iter().all(|&v| v == 110.0)));
    }
}
