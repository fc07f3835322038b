use clap::Parser;
use hydradenoise::dataset::{load_reference_patches, SamplingConfig};
use hydradenoise::eval::{evaluate_dataset, ComparisonSource, DatasetLayout, EvalConfig};
use hydradenoise::pipeline::{DirectoryPatchSink, PatchSink};
use hydradenoise::{
    CategoryCounts, CategoryRouter, DenoiseConfig, DenoiseMode, InferenceRun, JsonCheckpointLoader,
    ModelBank, ModelPaths, PatchDenoiser, RunConfig, SsimConfig,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "HydraDenoise CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output (per-image timing, routing decisions with RUST_LOG=debug).
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ModelDirsJson {
    all: PathBuf,
    low: PathBuf,
    medium: PathBuf,
    high: PathBuf,
}

impl Default for ModelDirsJson {
    fn default() -> Self {
        let root = PathBuf::from("models").join("subj1Trained");
        Self {
            all: root.join("MyDnCNN_all_noise"),
            low: root.join("MyDnCNN_low_noise"),
            medium: root.join("MyDnCNN_medium_noise"),
            high: root.join("MyDnCNN_high_noise"),
        }
    }
}

impl ModelDirsJson {
    fn to_paths(&self) -> ModelPaths {
        ModelPaths {
            all: self.all.clone(),
            low: self.low.clone(),
            medium: self.medium.clone(),
            high: self.high.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    set_dir: PathBuf,
    set_names: Vec<String>,
    model_dirs: ModelDirsJson,
    result_dir: PathBuf,
    reanalyze_data: bool,
    analyze_blurry: bool,
    train_data: PathBuf,
    save_result: bool,
    save_patches: bool,
    single_denoiser: bool,
    tile_size: usize,
    parallel: bool,
    sampling: SamplingConfig,
}

impl Default for Config {
    fn default() -> Self {
        let denoise = DenoiseConfig::default();
        Self {
            set_dir: PathBuf::from("data").join("subj1"),
            set_names: vec!["train".to_string()],
            model_dirs: ModelDirsJson::default(),
            result_dir: PathBuf::from("results").join("subj1Trained_results"),
            reanalyze_data: false,
            analyze_blurry: false,
            train_data: PathBuf::from("data").join("subj1").join("train"),
            save_result: true,
            save_patches: false,
            single_denoiser: true,
            tile_size: denoise.tile_size,
            parallel: denoise.parallel,
            sampling: SamplingConfig::default(),
        }
    }
}

impl Config {
    fn validate(&self) -> Result<(), String> {
        if self.set_names.is_empty() {
            return Err("set_names must list at least one dataset".to_string());
        }
        if self.tile_size == 0 {
            return Err("tile_size must be at least 1".to_string());
        }
        if !self.single_denoiser && self.tile_size != self.sampling.patch_size {
            return Err(format!(
                "tile_size ({}) must equal sampling.patch_size ({}) in multi-denoiser mode",
                self.tile_size, self.sampling.patch_size
            ));
        }
        Ok(())
    }
}

fn run_inference(
    config: &Config,
    layout: &DatasetLayout,
) -> Result<CategoryCounts, Box<dyn std::error::Error>> {
    let mode = if config.single_denoiser {
        DenoiseMode::Single
    } else {
        DenoiseMode::Multi
    };
    let bank = ModelBank::load(&config.model_dirs.to_paths(), mode, &JsonCheckpointLoader)?;
    tracing::info!(?bank, "models loaded");

    let router = match mode {
        DenoiseMode::Single => None,
        DenoiseMode::Multi => {
            let references = load_reference_patches(&config.train_data, &config.sampling)?;
            Some(CategoryRouter::new(&references, SsimConfig::standardized())?)
        }
    };

    let denoiser = PatchDenoiser::new(
        &bank,
        router.as_ref(),
        DenoiseConfig {
            tile_size: config.tile_size,
            mode,
            parallel: config.parallel,
        },
    )?;
    let run = InferenceRun::new(
        denoiser,
        RunConfig {
            save_result: config.save_result,
            eval: EvalConfig::default(),
        },
    );

    let mut totals = CategoryCounts::new();
    for set in &config.set_names {
        let mut sink = config
            .save_patches
            .then(|| DirectoryPatchSink::new(layout.result_set_dir(set)));
        let outcome = run.run_set(set, layout, sink.as_mut().map(|s| s as &mut dyn PatchSink))?;
        println!("{}", outcome.report.summary());
        totals.merge(&outcome.counts);
    }
    Ok(totals)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("hydradenoise=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    config.validate()?;

    fs::create_dir_all(&config.result_dir)?;
    let layout = DatasetLayout::new(&config.set_dir, &config.result_dir);

    let counts = if config.reanalyze_data {
        CategoryCounts::new()
    } else {
        run_inference(&config, &layout)?
    };

    let source = if config.analyze_blurry {
        ComparisonSource::Blurry
    } else {
        ComparisonSource::Denoised
    };
    let eval = EvalConfig {
        write_masked: config.save_result,
        ..EvalConfig::default()
    };
    for set in &config.set_names {
        let report = evaluate_dataset(set, &layout, source, &eval)?;
        println!("{}", report.summary());
    }

    println!("{counts}");
    Ok(())
}
