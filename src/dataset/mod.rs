//! Offline dataset preparation: split planning, intensity normalization,
//! residual images, and sampling of labelled reference patches for routing.

pub mod normalize;
pub mod reference;
pub mod residual;
pub mod split;

pub use normalize::{clahe, ClaheConfig};
#[cfg(feature = "image-io")]
pub use normalize::{match_histogram, normalize_split};
pub use reference::{sample_reference_patches, SamplingConfig};
#[cfg(feature = "image-io")]
pub use reference::load_reference_patches;
pub use residual::residual_image;
#[cfg(feature = "image-io")]
pub use residual::write_residuals;
pub use split::{plan_split, plan_split_shuffled, SplitPlan};
