//! Resolution of dataset assets (clear, blurry, mask, and denoised images).

use crate::eval::DatasetReport;
use crate::image::Image;
use crate::util::{DenoiseError, DenoiseResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Extensions recognized as images.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "bmp", "png"];

/// Returns true when `name` ends in a recognized image extension.
pub fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Recognized image names in `dir`, sorted.
pub(crate) fn image_names(dir: &Path) -> DenoiseResult<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|err| DenoiseError::io(dir, err))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| DenoiseError::io(dir, err))?;
        if let Some(name) = entry.file_name().to_str() {
            if is_image_name(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Role of an image within a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Ground truth.
    Clear,
    /// Co-registered noisy input.
    Blurry,
    /// Binary artifact mask (255 keeps a pixel).
    Mask,
    /// Output of the denoiser.
    Denoised,
}

impl AssetKind {
    /// Subdirectory of a dataset set holding this kind; empty for outputs,
    /// which live directly in the result set directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetKind::Clear => "ClearImages",
            AssetKind::Blurry => "CoregisteredBlurryImages",
            AssetKind::Mask => "Masks",
            AssetKind::Denoised => "",
        }
    }
}

/// Where dataset images live and how they are read and written.
pub trait AssetResolver {
    /// Recognized image names of a set, sorted, taken from the blurry inputs.
    fn list_images(&self, set: &str) -> DenoiseResult<Vec<String>>;

    /// Location of one asset, used for loading and for error reports.
    fn locate(&self, set: &str, kind: AssetKind, name: &str) -> PathBuf;

    /// Returns true when the asset exists.
    fn exists(&self, set: &str, kind: AssetKind, name: &str) -> bool {
        self.locate(set, kind, name).is_file()
    }

    /// Loads an asset as a grayscale image.
    fn load(&self, set: &str, kind: AssetKind, name: &str) -> DenoiseResult<Image>;

    /// Stores an image as the given asset.
    fn store(&self, set: &str, kind: AssetKind, name: &str, image: &Image) -> DenoiseResult<()>;

    /// Persists the score table of a set.
    fn store_report(&self, set: &str, report: &DatasetReport) -> DenoiseResult<()>;
}

/// On-disk layout: inputs under `<set_dir>/<set>/<Kind>/<name>`, outputs
/// under `<result_dir>/<set>/<name>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetLayout {
    set_dir: PathBuf,
    result_dir: PathBuf,
}

impl DatasetLayout {
    /// Creates a layout rooted at the given directories.
    pub fn new(set_dir: impl Into<PathBuf>, result_dir: impl Into<PathBuf>) -> Self {
        Self {
            set_dir: set_dir.into(),
            result_dir: result_dir.into(),
        }
    }

    /// Directory of one input set.
    pub fn set_path(&self, set: &str) -> PathBuf {
        self.set_dir.join(set)
    }

    /// Directory receiving the outputs of one set.
    pub fn result_set_dir(&self, set: &str) -> PathBuf {
        self.result_dir.join(set)
    }

    /// Directory receiving the individual tiles of one image.
    pub fn patch_dir(&self, set: &str, stem: &str) -> PathBuf {
        self.result_set_dir(set).join(format!("{stem}_patches"))
    }

    /// Path of the per-set results table.
    pub fn results_path(&self, set: &str) -> PathBuf {
        self.result_set_dir(set).join("results.txt")
    }

    /// Recognized image names of a set's blurry inputs, sorted.
    pub fn recognized_images(&self, set: &str) -> DenoiseResult<Vec<String>> {
        image_names(&self.set_path(set).join(AssetKind::Blurry.dir_name()))
    }

    /// Path of one asset under this layout.
    pub fn asset_path(&self, set: &str, kind: AssetKind, name: &str) -> PathBuf {
        match kind {
            AssetKind::Denoised => self.result_set_dir(set).join(name),
            _ => self.set_path(set).join(kind.dir_name()).join(name),
        }
    }
}

#[cfg(feature = "image-io")]
impl AssetResolver for DatasetLayout {
    fn list_images(&self, set: &str) -> DenoiseResult<Vec<String>> {
        self.recognized_images(set)
    }

    fn locate(&self, set: &str, kind: AssetKind, name: &str) -> PathBuf {
        self.asset_path(set, kind, name)
    }

    fn load(&self, set: &str, kind: AssetKind, name: &str) -> DenoiseResult<Image> {
        crate::image::io::load_gray_image(self.asset_path(set, kind, name))
    }

    fn store(&self, set: &str, kind: AssetKind, name: &str, image: &Image) -> DenoiseResult<()> {
        crate::image::io::save_gray_image(self.asset_path(set, kind, name), image)
    }

    fn store_report(&self, set: &str, report: &DatasetReport) -> DenoiseResult<()> {
        report.write_results(&self.results_path(set))
    }
}

type AssetSlot = (String, AssetKind, String);

/// In-memory asset store, for tests and for callers that already hold
/// their images in memory.
#[derive(Debug, Default)]
pub struct MemoryAssets {
    images: RefCell<HashMap<AssetSlot, Image>>,
    reports: RefCell<HashMap<String, DatasetReport>>,
}

impl MemoryAssets {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an asset.
    pub fn insert(&self, set: &str, kind: AssetKind, name: &str, image: Image) {
        self.images
            .borrow_mut()
            .insert((set.to_string(), kind, name.to_string()), image);
    }

    /// Returns a copy of a stored asset.
    pub fn get(&self, set: &str, kind: AssetKind, name: &str) -> Option<Image> {
        self.images
            .borrow()
            .get(&(set.to_string(), kind, name.to_string()))
            .cloned()
    }

    /// Returns the last report stored for `set`.
    pub fn report(&self, set: &str) -> Option<DatasetReport> {
        self.reports.borrow().get(set).cloned()
    }
}

impl AssetResolver for MemoryAssets {
    fn list_images(&self, set: &str) -> DenoiseResult<Vec<String>> {
        let mut names: Vec<String> = self
            .images
            .borrow()
            .keys()
            .filter(|(s, kind, name)| s == set && *kind == AssetKind::Blurry && is_image_name(name))
            .map(|(_, _, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn locate(&self, set: &str, kind: AssetKind, name: &str) -> PathBuf {
        Path::new(set).join(kind.dir_name()).join(name)
    }

    fn exists(&self, set: &str, kind: AssetKind, name: &str) -> bool {
        self.images
            .borrow()
            .contains_key(&(set.to_string(), kind, name.to_string()))
    }

    fn load(&self, set: &str, kind: AssetKind, name: &str) -> DenoiseResult<Image> {
        self.get(set, kind, name)
            .ok_or_else(|| DenoiseError::MissingAsset {
                path: self.locate(set, kind, name),
            })
    }

    fn store(&self, set: &str, kind: AssetKind, name: &str, image: &Image) -> DenoiseResult<()> {
        self.insert(set, kind, name, image.clone());
        Ok(())
    }

    fn store_report(&self, set: &str, report: &DatasetReport) -> DenoiseResult<()> {
        self.reports
            .borrow_mut()
            .insert(set.to_string(), report.clone());
        Ok(())
    }
}
