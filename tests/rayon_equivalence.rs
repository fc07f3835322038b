#![cfg(feature = "rayon")]

use hydradenoise::pipeline::{PatchContext, PatchSink};
use hydradenoise::{
    iter_tiles, standardize, CategoryCounts, CategoryRouter, DenoiseConfig, DenoiseError,
    DenoiseMode, DenoiseResult, Image, ImageView, ModelBank, ModelKey, NoiseCategory, PatchDenoiser,
    ReferencePatchSet, SsimConfig,
};

fn make_image(width: usize, height: usize, salt: usize) -> Image {
    Image::from_fn(width, height, |x, y| {
        (((x * 11) ^ (y * 3) ^ (x * y) ^ salt) & 0xFF) as f64
    })
    .unwrap()
}

fn shifting_model(shift: f64) -> Box<dyn hydradenoise::Denoiser> {
    Box::new(move |patch: ImageView<'_, f64>| {
        let owned = patch.to_image();
        Ok::<_, DenoiseError>(owned.map(|v| v * 0.5 + shift))
    })
}

#[derive(Default)]
struct RecordingSink {
    offsets: Vec<(usize, usize)>,
}

impl PatchSink for RecordingSink {
    fn save_patch(
        &mut self,
        _ctx: &PatchContext,
        row: usize,
        col: usize,
        _patch: &Image,
    ) -> DenoiseResult<()> {
        self.offsets.push((row, col));
        Ok(())
    }
}

#[test]
fn parallel_matches_sequential_multi_mode() {
    let reference = standardize(&make_image(120, 80, 0)).unwrap().image;
    let tiles: Vec<_> = iter_tiles(&reference, 20).unwrap().collect();
    let mut refs = ReferencePatchSet::new();
    for (idx, tile) in tiles.iter().enumerate().step_by(5) {
        let category = NoiseCategory::ORDER[idx % 3];
        refs.push(category, tile.patch.clone());
    }
    let router = CategoryRouter::new(&refs, SsimConfig::standardized()).unwrap();
    let bank = ModelBank::new()
        .with_model(ModelKey::All, shifting_model(0.0))
        .with_model(ModelKey::Low, shifting_model(1.0))
        .with_model(ModelKey::Medium, shifting_model(2.0))
        .with_model(ModelKey::High, shifting_model(3.0));

    let base = DenoiseConfig {
        tile_size: 20,
        mode: DenoiseMode::Multi,
        parallel: false,
    };
    let sequential = PatchDenoiser::new(&bank, Some(&router), base).unwrap();
    let parallel = PatchDenoiser::new(
        &bank,
        Some(&router),
        DenoiseConfig {
            parallel: true,
            ..base
        },
    )
    .unwrap();

    for salt in [0, 17, 99] {
        let noisy = standardize(&make_image(130, 85, salt)).unwrap().image;
        let ctx = PatchContext::default();

        let mut seq_counts = CategoryCounts::new();
        let mut seq_sink = RecordingSink::default();
        let seq_out = sequential
            .denoise_image(&noisy, &mut seq_counts, Some(&mut seq_sink), &ctx)
            .unwrap();

        let mut par_counts = CategoryCounts::new();
        let mut par_sink = RecordingSink::default();
        let par_out = parallel
            .denoise_image(&noisy, &mut par_counts, Some(&mut par_sink), &ctx)
            .unwrap();

        assert_eq!(seq_out, par_out);
        assert_eq!(seq_counts, par_counts);
        assert_eq!(seq_sink.offsets, par_sink.offsets);
        assert_eq!(seq_counts.total(), 24);
    }
}
