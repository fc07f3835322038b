use criterion::{criterion_group, criterion_main, Criterion};
use hydradenoise::model::IdentityDenoiser;
use hydradenoise::pipeline::PatchContext;
use hydradenoise::{
    iter_tiles, ssim, standardize, CategoryCounts, CategoryRouter, DenoiseConfig, DenoiseMode,
    Image, ModelBank, ModelKey, NoiseCategory, PatchDenoiser, ReferencePatchSet, SsimConfig,
};
use std::hint::black_box;

fn make_image(width: usize, height: usize, salt: usize) -> Image {
    Image::from_fn(width, height, |x, y| {
        (((x * 13) ^ (y * 7) ^ (x * y) ^ salt) & 0xFF) as f64
    })
    .unwrap()
}

fn make_references(per_category: usize) -> ReferencePatchSet {
    let source = standardize(&make_image(400, 400, 5)).unwrap().image;
    let mut refs = ReferencePatchSet::new();
    for (idx, tile) in iter_tiles(&source, 40).unwrap().enumerate() {
        let category = NoiseCategory::ORDER[idx % 3];
        if refs.patches(category).len() < per_category {
            refs.push(category, tile.patch);
        }
    }
    refs
}

fn bench_routing(c: &mut Criterion) {
    let a = make_image(40, 40, 1);
    let b = make_image(40, 40, 2);
    let cfg = SsimConfig::u8_range();
    c.bench_function("ssim_40x40", |bench| {
        bench.iter(|| black_box(ssim(&a, &b, &cfg).unwrap()));
    });

    let refs = make_references(30);
    let router = CategoryRouter::new(&refs, SsimConfig::standardized()).unwrap();
    let patch = standardize(&a).unwrap().image;
    c.bench_function("route_patch_90_refs", |bench| {
        bench.iter(|| black_box(router.select_category(&patch).unwrap()));
    });

    let bank = ModelBank::new()
        .with_model(ModelKey::All, Box::new(IdentityDenoiser))
        .with_model(ModelKey::Low, Box::new(IdentityDenoiser))
        .with_model(ModelKey::Medium, Box::new(IdentityDenoiser))
        .with_model(ModelKey::High, Box::new(IdentityDenoiser));
    let noisy = standardize(&make_image(320, 320, 9)).unwrap().image;
    let ctx = PatchContext::default();

    let sequential = PatchDenoiser::new(
        &bank,
        Some(&router),
        DenoiseConfig {
            tile_size: 40,
            mode: DenoiseMode::Multi,
            parallel: false,
        },
    )
    .unwrap();
    c.bench_function("denoise_320x320_multi", |bench| {
        bench.iter(|| {
            let mut counts = CategoryCounts::new();
            black_box(sequential.denoise_image(&noisy, &mut counts, None, &ctx).unwrap())
        });
    });

    if cfg!(feature = "rayon") {
        let parallel = PatchDenoiser::new(
            &bank,
            Some(&router),
            DenoiseConfig {
                tile_size: 40,
                mode: DenoiseMode::Multi,
                parallel: true,
            },
        )
        .unwrap();
        c.bench_function("denoise_320x320_multi_parallel", |bench| {
            bench.iter(|| {
                let mut counts = CategoryCounts::new();
                black_box(parallel.denoise_image(&noisy, &mut counts, None, &ctx).unwrap())
            });
        });
    }
}

criterion_group!(benches, bench_routing);
criterion_main!(benches);
