//! Similarity-based routing of patches to noise categories.
//!
//! Every query patch is compared with every reference patch by mean SSIM.
//! The routed category is the one owning the single best-scoring reference
//! patch. Categories are visited in the fixed order low, medium, high and
//! reference patches in insertion order; a later candidate replaces the
//! current best only with a strictly greater score, so ties go to the
//! earlier category.
//!
//! This is the dominant cost of multi-model inference:
//! `categories x references x SSIM`. Reference window statistics are
//! planned once in [`CategoryRouter::new`] and only the cross term is
//! computed per query.

mod counts;

pub use counts::CategoryCounts;

use crate::image::Image;
use crate::metric::{SsimConfig, SsimPlan};
use crate::model::ModelKey;
use crate::trace::trace_event;
use crate::util::{DenoiseError, DenoiseResult};
use std::fmt;

/// Noise level a patch is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoiseCategory {
    Low,
    Medium,
    High,
}

impl NoiseCategory {
    /// Evaluation order used by the router.
    pub const ORDER: [NoiseCategory; 3] =
        [NoiseCategory::Low, NoiseCategory::Medium, NoiseCategory::High];

    /// Lowercase name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            NoiseCategory::Low => "low",
            NoiseCategory::Medium => "medium",
            NoiseCategory::High => "high",
        }
    }

    /// Model that denoises patches of this category.
    pub fn model_key(self) -> ModelKey {
        match self {
            NoiseCategory::Low => ModelKey::Low,
            NoiseCategory::Medium => ModelKey::Medium,
            NoiseCategory::High => ModelKey::High,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            NoiseCategory::Low => 0,
            NoiseCategory::Medium => 1,
            NoiseCategory::High => 2,
        }
    }
}

impl fmt::Display for NoiseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labelled reference patches, grouped by category in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferencePatchSet {
    patches: [Vec<Image>; 3],
}

impl ReferencePatchSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reference patch to `category`.
    pub fn push(&mut self, category: NoiseCategory, patch: Image) {
        self.patches[category.index()].push(patch);
    }

    /// Returns the reference patches of `category`.
    pub fn patches(&self, category: NoiseCategory) -> &[Image] {
        &self.patches[category.index()]
    }

    /// Total number of reference patches.
    pub fn len(&self) -> usize {
        self.patches.iter().map(Vec::len).sum()
    }

    /// Returns true when no category holds a patch.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of routing one patch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Routing {
    /// Category of the best-matching reference patch.
    pub category: NoiseCategory,
    /// Mean SSIM with that reference patch.
    pub score: f64,
}

/// Router with precomputed reference statistics.
#[derive(Clone, Debug)]
pub struct CategoryRouter {
    cfg: SsimConfig,
    plans: [Vec<SsimPlan>; 3],
}

impl CategoryRouter {
    /// Plans every reference patch. Fails if the set holds no patch at all.
    pub fn new(references: &ReferencePatchSet, cfg: SsimConfig) -> DenoiseResult<Self> {
        if references.is_empty() {
            return Err(DenoiseError::EmptyReferenceSet);
        }
        let mut plans: [Vec<SsimPlan>; 3] = Default::default();
        for category in NoiseCategory::ORDER {
            plans[category.index()] = references
                .patches(category)
                .iter()
                .map(|patch| SsimPlan::new(patch, cfg))
                .collect::<DenoiseResult<_>>()?;
        }
        trace_event!(
            "router_ready",
            low = plans[0].len(),
            medium = plans[1].len(),
            high = plans[2].len()
        );
        Ok(Self { cfg, plans })
    }

    /// SSIM settings used for every comparison.
    pub fn config(&self) -> &SsimConfig {
        &self.cfg
    }

    /// Routes `patch` to the category of its most similar reference patch.
    pub fn select_category(&self, patch: &Image) -> DenoiseResult<Routing> {
        let query = SsimPlan::new(patch, self.cfg)?;
        let mut best: Option<Routing> = None;
        let mut best_score = f64::NEG_INFINITY;
        for category in NoiseCategory::ORDER {
            for reference in &self.plans[category.index()] {
                let score = reference.compare(&query)?;
                if score > best_score {
                    best_score = score;
                    best = Some(Routing { category, score });
                }
            }
        }
        best.ok_or(DenoiseError::InvalidInput("no finite similarity score"))
    }
}

/// One-off routing without keeping the planned references around.
pub fn select_category(
    patch: &Image,
    references: &ReferencePatchSet,
    cfg: SsimConfig,
) -> DenoiseResult<NoiseCategory> {
    Ok(CategoryRouter::new(references, cfg)?
        .select_category(patch)?
        .category)
}
