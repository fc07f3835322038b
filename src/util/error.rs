//! Error types for hydradenoise.

use crate::model::ModelKey;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for hydradenoise operations.
pub type DenoiseResult<T> = std::result::Result<T, DenoiseError>;

/// Errors that can occur while preparing data, denoising, or evaluating.
#[derive(Debug, Error, PartialEq)]
pub enum DenoiseError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Width or height is zero or overflows the address space.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// A backing buffer is shorter than the declared dimensions require.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Two images that must share a shape do not.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// The image has zero variance and cannot be standardized.
    #[error("degenerate image: {reason}")]
    DegenerateImage { reason: &'static str },
    /// A denoising model could not be loaded or is unavailable.
    #[error("failed to load {key} model from {}: {reason}", path.display())]
    ModelLoad {
        key: ModelKey,
        path: PathBuf,
        reason: String,
    },
    /// A checkpoint file could not be parsed.
    #[error("invalid checkpoint: {reason}")]
    InvalidCheckpoint { reason: String },
    /// An expected clear image, mask, or comparison image is absent.
    #[error("missing asset: {}", path.display())]
    MissingAsset { path: PathBuf },
    /// The reference set contains no patches in any category.
    #[error("reference patch set is empty")]
    EmptyReferenceSet,
    /// Image decoding or encoding failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
    /// Filesystem access failed.
    #[error("io error at {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },
}

impl DenoiseError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
