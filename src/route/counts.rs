//! Per-category tally of routed patches.

use crate::route::NoiseCategory;
use std::fmt;

/// Number of patches routed to each category.
///
/// Each denoising call fills its own accumulator; callers merge them to get
/// run totals, so no process-wide state is involved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    counts: [u64; 3],
}

impl CategoryCounts {
    /// Creates a zeroed tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one patch routed to `category`.
    pub fn increment(&mut self, category: NoiseCategory) {
        self.counts[category.index()] += 1;
    }

    /// Returns the count for `category`.
    pub fn get(&self, category: NoiseCategory) -> u64 {
        self.counts[category.index()]
    }

    /// Adds another tally into this one.
    pub fn merge(&mut self, other: &CategoryCounts) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts) {
            *mine += theirs;
        }
    }

    /// Sum over all categories.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

impl fmt::Display for CategoryCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, category) in NoiseCategory::ORDER.into_iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "total {category}-noise patches: {}", self.get(category))?;
        }
        Ok(())
    }
}
