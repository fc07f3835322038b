use hydradenoise::eval::MemoryAssets;
use hydradenoise::model::IdentityDenoiser;
use hydradenoise::pipeline::PatchContext;
use hydradenoise::{
    iter_tiles, standardize, AssetKind, CategoryCounts, CategoryRouter, DenoiseConfig,
    DenoiseMode, Image, ImageView, InferenceRun, ModelBank, ModelKey, NoiseCategory,
    PatchDenoiser, ReferencePatchSet, RunConfig, SsimConfig, TileGrid,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn make_scene(width: usize, height: usize) -> Image {
    Image::from_fn(width, height, |x, y| {
        let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
        value as f64
    })
    .unwrap()
}

fn add_noise(image: &Image, amplitude: f64, seed: u64) -> Image {
    let mut rng = StdRng::seed_from_u64(seed);
    Image::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get(x, y).unwrap_or(0.0);
        (v + rng.random_range(-amplitude..=amplitude)).clamp(0.0, 255.0)
    })
    .unwrap()
}

fn tagging_model(tag: f64) -> Box<dyn hydradenoise::Denoiser> {
    Box::new(move |patch: ImageView<'_, f64>| {
        Image::filled(patch.width(), patch.height(), tag)
    })
}

fn specialist_bank() -> ModelBank {
    ModelBank::new()
        .with_model(ModelKey::All, tagging_model(0.0))
        .with_model(ModelKey::Low, tagging_model(1.0))
        .with_model(ModelKey::Medium, tagging_model(2.0))
        .with_model(ModelKey::High, tagging_model(3.0))
}

#[test]
fn identity_denoiser_reproduces_standardized_input() {
    let noisy = add_noise(&make_scene(80, 80), 20.0, 1);
    let standardized = standardize(&noisy).unwrap();
    let bank = ModelBank::new().with_model(ModelKey::All, Box::new(IdentityDenoiser));
    let denoiser = PatchDenoiser::new(&bank, None, DenoiseConfig::default()).unwrap();

    let mut counts = CategoryCounts::new();
    let out = denoiser
        .denoise_image(&standardized.image, &mut counts, None, &PatchContext::default())
        .unwrap();
    assert_eq!(out, standardized.image);
    assert_eq!(counts.total(), 0);
}

#[test]
fn tile_count_matches_floor_division() {
    for (width, height, size) in [(80, 80, 40), (101, 57, 40), (39, 200, 40), (17, 9, 4)] {
        let image = make_scene(width, height);
        let tiles: Vec<_> = iter_tiles(&image, size).unwrap().collect();
        let grid = TileGrid::new(width, height, size).unwrap();
        assert_eq!(tiles.len(), (height / size) * (width / size));
        assert_eq!(tiles.len(), grid.len());

        let offsets: Vec<(usize, usize)> = tiles.iter().map(|t| (t.row, t.col)).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted, "tiles are emitted in raster order");
    }
}

#[test]
fn routed_patch_count_is_tiles_times_images() {
    let scene = make_scene(96, 64);
    let tiles: Vec<_> = iter_tiles(&standardize(&scene).unwrap().image, 32)
        .unwrap()
        .collect();
    let mut refs = ReferencePatchSet::new();
    refs.push(NoiseCategory::Low, tiles[0].patch.clone());
    refs.push(NoiseCategory::Medium, tiles[2].patch.clone());
    refs.push(NoiseCategory::High, tiles[4].patch.clone());
    let router = CategoryRouter::new(&refs, SsimConfig::standardized()).unwrap();
    let bank = specialist_bank();
    let cfg = DenoiseConfig {
        tile_size: 32,
        mode: DenoiseMode::Multi,
        parallel: false,
    };
    let denoiser = PatchDenoiser::new(&bank, Some(&router), cfg).unwrap();

    let images = 4;
    let mut counts = CategoryCounts::new();
    for seed in 0..images {
        let noisy = standardize(&add_noise(&scene, 10.0, seed)).unwrap().image;
        denoiser
            .denoise_image(&noisy, &mut counts, None, &PatchContext::default())
            .unwrap();
    }
    assert_eq!(counts.total(), (tiles.len() as u64) * images);
}

#[test]
fn patch_equal_to_a_reference_routes_to_its_category() {
    let scene = standardize(&make_scene(64, 64)).unwrap().image;
    let tiles: Vec<_> = iter_tiles(&scene, 32).unwrap().collect();
    let mut refs = ReferencePatchSet::new();
    refs.push(NoiseCategory::Low, tiles[1].patch.clone());
    refs.push(NoiseCategory::Medium, tiles[3].patch.clone());
    refs.push(NoiseCategory::High, tiles[0].patch.clone());
    let router = CategoryRouter::new(&refs, SsimConfig::standardized()).unwrap();

    let first = router.select_category(&tiles[0].patch).unwrap();
    assert_eq!(first.category, NoiseCategory::High);
    assert!((first.score - 1.0).abs() < 1e-9);

    let again = router.select_category(&tiles[0].patch).unwrap();
    assert_eq!(first, again);

    let bank = specialist_bank();
    let cfg = DenoiseConfig {
        tile_size: 32,
        mode: DenoiseMode::Multi,
        parallel: false,
    };
    let denoiser = PatchDenoiser::new(&bank, Some(&router), cfg).unwrap();
    let mut counts = CategoryCounts::new();
    let out = denoiser
        .denoise_image(&scene, &mut counts, None, &PatchContext::default())
        .unwrap();
    assert_eq!(out.get(0, 0), Some(3.0));
    assert_eq!(out.get(32, 0), Some(1.0));
    assert_eq!(out.get(32, 32), Some(2.0));
    assert_eq!(counts.total(), 4);
    for category in NoiseCategory::ORDER {
        assert!(counts.get(category) >= 1, "{category}");
    }
}

#[test]
fn inference_run_scores_identity_output_as_perfect() {
    let assets = MemoryAssets::new();
    for (idx, seed) in [3u64, 5].into_iter().enumerate() {
        let scene = add_noise(&make_scene(80, 80), 30.0, seed);
        let name = format!("slice_{idx}.png");
        assets.insert("val", AssetKind::Clear, &name, scene.clone());
        assets.insert("val", AssetKind::Blurry, &name, scene);
    }
    let bank = ModelBank::new().with_model(ModelKey::All, Box::new(IdentityDenoiser));
    let denoiser = PatchDenoiser::new(&bank, None, DenoiseConfig::default()).unwrap();
    let run = InferenceRun::new(denoiser, RunConfig::default());

    let outcome = run.run_set("val", &assets, None).unwrap();
    assert_eq!(outcome.report.len(), 2);
    for score in outcome.report.scores() {
        assert!(score.psnr > 100.0, "{}: {}", score.name, score.psnr);
        assert!(score.ssim > 0.9999);
    }
    assert_eq!(outcome.counts.total(), 0);

    let stored = assets.get("val", AssetKind::Denoised, "slice_0.png").unwrap();
    let clear = assets.get("val", AssetKind::Clear, "slice_0.png").unwrap();
    for (a, b) in stored.data().iter().zip(clear.data()) {
        assert!((a - b).abs() < 1e-6);
    }
    let report = assets.report("val").unwrap();
    assert_eq!(report.rows().len(), 3);
}
