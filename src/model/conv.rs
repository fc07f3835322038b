//! Residual convolutional denoiser loaded from JSON checkpoints.
//!
//! The network is a plain stack of same-padded 2D convolutions with an
//! optional ReLU after each layer. With `residual` set, the network predicts
//! the noise and the output is `input - prediction`.

use crate::image::{Image, ImageView};
use crate::model::Denoiser;
use crate::util::{DenoiseError, DenoiseResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One convolution layer. `weights` is laid out as
/// `[out_channel][in_channel][ky][kx]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvLayer {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub relu: bool,
}

/// Serialized network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvCheckpoint {
    #[serde(default)]
    pub epoch: Option<u32>,
    #[serde(default = "default_residual")]
    pub residual: bool,
    pub layers: Vec<ConvLayer>,
}

fn default_residual() -> bool {
    true
}

/// Validated convolutional denoiser.
#[derive(Clone, Debug)]
pub struct ConvDenoiser {
    checkpoint: ConvCheckpoint,
}

impl ConvDenoiser {
    /// Validates layer shapes and channel chaining.
    pub fn new(checkpoint: ConvCheckpoint) -> DenoiseResult<Self> {
        if checkpoint.layers.is_empty() {
            return Err(DenoiseError::InvalidInput("checkpoint has no layers"));
        }
        let mut channels = 1;
        for layer in &checkpoint.layers {
            if layer.in_channels != channels {
                return Err(DenoiseError::InvalidInput("layer channels do not chain"));
            }
            if layer.kernel_size == 0 || layer.kernel_size % 2 == 0 {
                return Err(DenoiseError::InvalidInput("kernel_size must be odd"));
            }
            let expected =
                layer.out_channels * layer.in_channels * layer.kernel_size * layer.kernel_size;
            if layer.weights.len() != expected || layer.bias.len() != layer.out_channels {
                return Err(DenoiseError::InvalidInput("layer weight count mismatch"));
            }
            channels = layer.out_channels;
        }
        if channels != 1 {
            return Err(DenoiseError::InvalidInput("last layer must have one channel"));
        }
        Ok(Self { checkpoint })
    }

    /// Parses and validates a JSON checkpoint.
    pub fn from_json_str(text: &str) -> DenoiseResult<Self> {
        let checkpoint: ConvCheckpoint = serde_json::from_str(text).map_err(|err| {
            DenoiseError::InvalidCheckpoint {
                reason: err.to_string(),
            }
        })?;
        Self::new(checkpoint)
    }

    /// Reads, parses, and validates a JSON checkpoint file.
    pub fn from_json_file(path: &Path) -> DenoiseResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| DenoiseError::io(path, err))?;
        Self::from_json_str(&text)
    }

    /// Returns the underlying checkpoint.
    pub fn checkpoint(&self) -> &ConvCheckpoint {
        &self.checkpoint
    }
}

impl Denoiser for ConvDenoiser {
    fn denoise(&self, patch: ImageView<'_, f64>) -> DenoiseResult<Image> {
        let input = patch.to_image();
        let (width, height) = (input.width(), input.height());
        let mut maps = vec![input.data().to_vec()];
        for layer in &self.checkpoint.layers {
            maps = conv_layer(&maps, layer, width, height);
        }
        let prediction = maps.pop().unwrap_or_default();
        let out: Vec<f64> = if self.checkpoint.residual {
            input
                .data()
                .iter()
                .zip(&prediction)
                .map(|(x, n)| x - n)
                .collect()
        } else {
            prediction
        };
        Image::new(out, width, height)
    }
}

fn conv_layer(input: &[Vec<f64>], layer: &ConvLayer, width: usize, height: usize) -> Vec<Vec<f64>> {
    let k = layer.kernel_size;
    let r = (k / 2) as isize;
    let mut out = Vec::with_capacity(layer.out_channels);
    for oc in 0..layer.out_channels {
        let mut map = vec![layer.bias[oc]; width * height];
        for (ic, src) in input.iter().enumerate() {
            let base = (oc * layer.in_channels + ic) * k * k;
            let kernel = &layer.weights[base..base + k * k];
            for y in 0..height as isize {
                for x in 0..width as isize {
                    let mut acc = 0.0;
                    for ky in 0..k as isize {
                        let sy = y + ky - r;
                        if sy < 0 || sy >= height as isize {
                            continue;
                        }
                        for kx in 0..k as isize {
                            let sx = x + kx - r;
                            if sx < 0 || sx >= width as isize {
                                continue;
                            }
                            acc += kernel[(ky * k as isize + kx) as usize]
                                * src[sy as usize * width + sx as usize];
                        }
                    }
                    map[y as usize * width + x as usize] += acc;
                }
            }
        }
        if layer.relu {
            map.iter_mut().for_each(|v| *v = v.max(0.0));
        }
        out.push(map);
    }
    out
}
