//! Checkpoint file naming and latest-epoch discovery.
//!
//! Checkpoints are stored one directory per model as `model_NNN.json`,
//! where `NNN` is the zero-padded training epoch.

use crate::util::{DenoiseError, DenoiseResult};
use std::path::{Path, PathBuf};

const PREFIX: &str = "model_";
const EXTENSION: &str = "json";

/// Path of the checkpoint written after `epoch`.
pub fn checkpoint_path(dir: &Path, epoch: u32) -> PathBuf {
    dir.join(format!("{PREFIX}{epoch:03}.{EXTENSION}"))
}

/// Returns the highest epoch with a checkpoint in `dir`, if any.
pub fn find_last_checkpoint(dir: &Path) -> DenoiseResult<Option<u32>> {
    let entries = std::fs::read_dir(dir).map_err(|err| DenoiseError::io(dir, err))?;
    let mut last = None;
    for entry in entries {
        let entry = entry.map_err(|err| DenoiseError::io(dir, err))?;
        let name = entry.file_name();
        if let Some(epoch) = name.to_str().and_then(parse_epoch) {
            last = last.max(Some(epoch));
        }
    }
    Ok(last)
}

/// Path of the latest checkpoint in `dir`.
pub fn latest_checkpoint(dir: &Path) -> DenoiseResult<PathBuf> {
    match find_last_checkpoint(dir)? {
        Some(epoch) => Ok(checkpoint_path(dir, epoch)),
        None => Err(DenoiseError::InvalidInput("no model_NNN.json checkpoint found")),
    }
}

fn parse_epoch(name: &str) -> Option<u32> {
    let stem = name.strip_prefix(PREFIX)?.strip_suffix(EXTENSION)?;
    let digits = stem.strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
