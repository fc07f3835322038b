//! Train/validation/test partitioning of image names.

use crate::util::{DenoiseError, DenoiseResult};
use rand::seq::SliceRandom;
use rand::Rng;

/// Names assigned to each partition, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitPlan {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test: Vec<String>,
}

impl SplitPlan {
    /// Total number of assigned names.
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    /// Returns true when nothing was assigned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deterministic interleaved split.
///
/// Validation takes every `floor(1 / val_ratio)`-th name starting with the
/// first; test takes every `floor(1 / test_ratio + 1)`-th name that is not
/// already in validation; everything else is training data.
pub fn plan_split(names: &[String], val_ratio: f64, test_ratio: f64) -> DenoiseResult<SplitPlan> {
    check_ratio(val_ratio)?;
    check_ratio(test_ratio)?;
    if names.is_empty() {
        return Ok(SplitPlan::default());
    }

    let val_step = ((1.0 / val_ratio) as usize).max(1);
    let test_step = ((1.0 / test_ratio + 1.0) as usize).max(1);

    let val: Vec<String> = names.iter().step_by(val_step).cloned().collect();
    let test: Vec<String> = names
        .iter()
        .step_by(test_step)
        .filter(|name| !val.contains(name))
        .cloned()
        .collect();
    let train = names
        .iter()
        .filter(|name| !val.contains(name) && !test.contains(name))
        .cloned()
        .collect();
    Ok(SplitPlan { train, val, test })
}

/// Random split: shuffle, then cut at `1 - val_ratio - test_ratio` and
/// `1 - test_ratio` of the list.
pub fn plan_split_shuffled<R: Rng + ?Sized>(
    names: &[String],
    val_ratio: f64,
    test_ratio: f64,
    rng: &mut R,
) -> DenoiseResult<SplitPlan> {
    check_ratio(val_ratio)?;
    check_ratio(test_ratio)?;
    if val_ratio + test_ratio > 1.0 {
        return Err(DenoiseError::InvalidInput("split ratios exceed 1"));
    }
    let mut shuffled = names.to_vec();
    shuffled.shuffle(rng);
    let len = shuffled.len() as f64;
    let train_end = (len * (1.0 - val_ratio - test_ratio)) as usize;
    let val_end = ((len * (1.0 - test_ratio)) as usize).max(train_end);
    let test = shuffled.split_off(val_end);
    let val = shuffled.split_off(train_end);
    Ok(SplitPlan {
        train: shuffled,
        val,
        test,
    })
}

fn check_ratio(ratio: f64) -> DenoiseResult<()> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(DenoiseError::InvalidInput("split ratio must be in (0, 1]"));
    }
    Ok(())
}
