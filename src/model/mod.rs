//! Denoising models and the per-category model bank.
//!
//! A model is an opaque [`Denoiser`]: one patch in, one patch of the same
//! shape out. The [`ModelBank`] maps the closed set of [`ModelKey`]s to
//! loaded models through a fixed table, so dispatch never depends on string
//! lookups.

pub mod checkpoint;
mod conv;

pub use checkpoint::{checkpoint_path, find_last_checkpoint, latest_checkpoint};
pub use conv::{ConvCheckpoint, ConvDenoiser, ConvLayer};

use crate::image::{ensure_same_shape, Image, ImageView};
use crate::util::{DenoiseError, DenoiseResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// Key of a model in the bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKey {
    /// General model trained on every noise level.
    All,
    /// Specialist for low-noise patches.
    Low,
    /// Specialist for medium-noise patches.
    Medium,
    /// Specialist for high-noise patches.
    High,
}

impl ModelKey {
    /// Every key, in table order.
    pub const ALL_KEYS: [ModelKey; 4] = [
        ModelKey::All,
        ModelKey::Low,
        ModelKey::Medium,
        ModelKey::High,
    ];

    /// Lowercase name used in logs and directory names.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKey::All => "all",
            ModelKey::Low => "low",
            ModelKey::Medium => "medium",
            ModelKey::High => "high",
        }
    }

    fn index(self) -> usize {
        match self {
            ModelKey::All => 0,
            ModelKey::Low => 1,
            ModelKey::Medium => 2,
            ModelKey::High => 3,
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How patches are assigned to models.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DenoiseMode {
    /// Every patch goes to the `All` model.
    #[default]
    Single,
    /// Patches are routed to the `Low`/`Medium`/`High` specialists.
    Multi,
}

impl DenoiseMode {
    /// Models that must be loaded before running in this mode.
    pub fn required_keys(self) -> &'static [ModelKey] {
        match self {
            DenoiseMode::Single => &[ModelKey::All],
            DenoiseMode::Multi => &ModelKey::ALL_KEYS,
        }
    }
}

/// A patch denoiser. Implementations must not depend on call order.
pub trait Denoiser: Send + Sync {
    /// Denoises one patch and returns a new patch of the same shape.
    fn denoise(&self, patch: ImageView<'_, f64>) -> DenoiseResult<Image>;
}

/// Returns its input unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityDenoiser;

impl Denoiser for IdentityDenoiser {
    fn denoise(&self, patch: ImageView<'_, f64>) -> DenoiseResult<Image> {
        Ok(patch.to_image())
    }
}

impl<F> Denoiser for F
where
    F: Fn(ImageView<'_, f64>) -> DenoiseResult<Image> + Send + Sync,
{
    fn denoise(&self, patch: ImageView<'_, f64>) -> DenoiseResult<Image> {
        self(patch)
    }
}

/// Checkpoint directory of each model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelPaths {
    pub all: PathBuf,
    pub low: PathBuf,
    pub medium: PathBuf,
    pub high: PathBuf,
}

impl ModelPaths {
    /// Returns the directory configured for `key`.
    pub fn get(&self, key: ModelKey) -> &Path {
        match key {
            ModelKey::All => &self.all,
            ModelKey::Low => &self.low,
            ModelKey::Medium => &self.medium,
            ModelKey::High => &self.high,
        }
    }
}

/// Loads one model from its checkpoint directory.
pub trait ModelLoader {
    fn load(&self, key: ModelKey, dir: &Path) -> DenoiseResult<Box<dyn Denoiser>>;
}

/// Loads the latest `model_NNN.json` checkpoint of a directory as a
/// [`ConvDenoiser`].
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCheckpointLoader;

impl ModelLoader for JsonCheckpointLoader {
    fn load(&self, key: ModelKey, dir: &Path) -> DenoiseResult<Box<dyn Denoiser>> {
        let path = latest_checkpoint(dir).map_err(|err| DenoiseError::ModelLoad {
            key,
            path: dir.to_path_buf(),
            reason: err.to_string(),
        })?;
        let model = ConvDenoiser::from_json_file(&path).map_err(|err| DenoiseError::ModelLoad {
            key,
            path: path.clone(),
            reason: err.to_string(),
        })?;
        Ok(Box::new(model))
    }
}

/// Fixed table from [`ModelKey`] to a loaded model.
#[derive(Default)]
pub struct ModelBank {
    models: [Option<Box<dyn Denoiser>>; 4],
}

impl ModelBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bank with `model` installed under `key`.
    pub fn with_model(mut self, key: ModelKey, model: Box<dyn Denoiser>) -> Self {
        self.insert(key, model);
        self
    }

    /// Installs `model` under `key`, replacing any previous model.
    pub fn insert(&mut self, key: ModelKey, model: Box<dyn Denoiser>) {
        self.models[key.index()] = Some(model);
    }

    /// Returns true when a model is loaded for `key`.
    pub fn contains(&self, key: ModelKey) -> bool {
        self.models[key.index()].is_some()
    }

    /// Loads every model `mode` requires. Fails on the first model that
    /// cannot be loaded; no partially loaded bank is returned.
    pub fn load(
        paths: &ModelPaths,
        mode: DenoiseMode,
        loader: &dyn ModelLoader,
    ) -> DenoiseResult<Self> {
        let mut bank = Self::new();
        for &key in mode.required_keys() {
            let dir = paths.get(key);
            if !dir.is_dir() {
                return Err(DenoiseError::ModelLoad {
                    key,
                    path: dir.to_path_buf(),
                    reason: "checkpoint directory does not exist".to_string(),
                });
            }
            bank.insert(key, loader.load(key, dir)?);
        }
        Ok(bank)
    }

    /// Checks that every model `mode` requires is present.
    pub fn ensure_ready(&self, mode: DenoiseMode) -> DenoiseResult<()> {
        match mode.required_keys().iter().find(|&&key| !self.contains(key)) {
            Some(&key) => Err(DenoiseError::ModelLoad {
                key,
                path: PathBuf::new(),
                reason: "model not loaded".to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Runs the model stored under `key` on `patch`.
    pub fn infer(&self, key: ModelKey, patch: &Image) -> DenoiseResult<Image> {
        let model = self.models[key.index()]
            .as_deref()
            .ok_or_else(|| DenoiseError::ModelLoad {
                key,
                path: PathBuf::new(),
                reason: "model not loaded".to_string(),
            })?;
        let out = model.denoise(patch.view())?;
        ensure_same_shape(patch.shape(), out.shape())?;
        Ok(out)
    }
}

impl fmt::Debug for ModelBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loaded: Vec<&str> = ModelKey::ALL_KEYS
            .iter()
            .filter(|&&key| self.contains(key))
            .map(|key| key.as_str())
            .collect();
        f.debug_struct("ModelBank").field("loaded", &loaded).finish()
    }
}
