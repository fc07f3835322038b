//! Per-dataset score tables.

use crate::util::math::mean;
use crate::util::{DenoiseError, DenoiseResult};
use std::fmt::Write as _;
use std::path::Path;

/// PSNR and SSIM of one image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageScore {
    pub name: String,
    pub psnr: f64,
    pub ssim: f64,
}

/// Which PSNR entries enter the average.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PsnrAveraging {
    /// Only strictly positive values (masked evaluation).
    #[default]
    PositiveOnly,
    /// Every value (inference run).
    All,
}

/// Scores of every image of one dataset, in evaluation order.
///
/// In masked evaluation the PSNR average ignores non-positive entries while
/// the SSIM average uses every entry. The asymmetry is long-standing
/// reported behaviour and is kept so numbers stay comparable with earlier
/// runs. Inference reports average every PSNR entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetReport {
    set_name: String,
    scores: Vec<ImageScore>,
    averaging: PsnrAveraging,
}

impl DatasetReport {
    /// Creates an empty evaluation report for `set_name`.
    pub fn new(set_name: &str) -> Self {
        Self::with_averaging(set_name, PsnrAveraging::PositiveOnly)
    }

    /// Creates an empty report averaging PSNR as `averaging` says.
    pub fn with_averaging(set_name: &str, averaging: PsnrAveraging) -> Self {
        Self {
            set_name: set_name.to_string(),
            scores: Vec::new(),
            averaging,
        }
    }

    /// PSNR averaging rule of this report.
    pub fn averaging(&self) -> PsnrAveraging {
        self.averaging
    }

    /// Name of the evaluated set.
    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    /// Appends one image's scores.
    pub fn push(&mut self, score: ImageScore) {
        self.scores.push(score);
    }

    /// Scores in evaluation order.
    pub fn scores(&self) -> &[ImageScore] {
        &self.scores
    }

    /// Number of scored images.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true when no image was scored.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Per-image PSNR values.
    pub fn psnrs(&self) -> Vec<f64> {
        self.scores.iter().map(|s| s.psnr).collect()
    }

    /// Per-image SSIM values.
    pub fn ssims(&self) -> Vec<f64> {
        self.scores.iter().map(|s| s.ssim).collect()
    }

    /// Mean PSNR under the report's averaging rule; `NaN` if no entry counts.
    pub fn psnr_avg(&self) -> f64 {
        let psnrs = self.psnrs();
        match self.averaging {
            PsnrAveraging::PositiveOnly => {
                let positive: Vec<f64> = psnrs.into_iter().filter(|&p| p > 0.0).collect();
                mean(&positive)
            }
            PsnrAveraging::All => mean(&psnrs),
        }
    }

    /// Mean SSIM over every entry; `NaN` for an empty report.
    pub fn ssim_avg(&self) -> f64 {
        mean(&self.ssims())
    }

    /// `(psnr, ssim)` per image followed by the `(psnr_avg, ssim_avg)` row.
    pub fn rows(&self) -> Vec<(f64, f64)> {
        let mut rows: Vec<(f64, f64)> = self.scores.iter().map(|s| (s.psnr, s.ssim)).collect();
        rows.push((self.psnr_avg(), self.ssim_avg()));
        rows
    }

    /// Two whitespace-separated columns with four decimals, average last.
    pub fn results_text(&self) -> String {
        let mut out = String::new();
        for (psnr, ssim) in self.rows() {
            let _ = writeln!(out, "{psnr:.4} {ssim:.4}");
        }
        out
    }

    /// Writes [`Self::results_text`] to `path`, creating parent directories.
    pub fn write_results(&self, path: &Path) -> DenoiseResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| DenoiseError::io(parent, err))?;
        }
        std::fs::write(path, self.results_text()).map_err(|err| DenoiseError::io(path, err))
    }

    /// One-line summary used in logs and console output.
    pub fn summary(&self) -> String {
        format!(
            "Dataset: {:10} \n  Average PSNR = {:2.2}dB, Average SSIM = {:1.4}",
            self.set_name,
            self.psnr_avg(),
            self.ssim_avg()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(values: &[(f64, f64)]) -> DatasetReport {
        let mut report = DatasetReport::new("test");
        for (idx, &(psnr, ssim)) in values.iter().enumerate() {
            report.push(ImageScore {
                name: format!("{idx}.png"),
                psnr,
                ssim,
            });
        }
        report
    }

    #[test]
    fn psnr_average_skips_non_positive_entries() {
        let report = report(&[(-1.0, 0.2), (30.0, 0.8), (25.0, 0.5)]);
        assert!((report.psnr_avg() - 27.5).abs() < 1e-12);
        assert!((report.ssim_avg() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_psnr_is_excluded_but_negative_ssim_is_kept() {
        let report = report(&[(0.0, -0.4), (20.0, 0.6)]);
        assert!((report.psnr_avg() - 20.0).abs() < 1e-12);
        assert!((report.ssim_avg() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn inference_report_averages_every_psnr() {
        let mut report = DatasetReport::with_averaging("val", PsnrAveraging::All);
        for (idx, &(psnr, ssim)) in [(-1.0, 0.2), (30.0, 0.8), (25.0, 0.5)].iter().enumerate() {
            report.push(ImageScore {
                name: format!("{idx}.png"),
                psnr,
                ssim,
            });
        }
        assert!((report.psnr_avg() - 18.0).abs() < 1e-12);
        assert!((report.ssim_avg() - 0.5).abs() < 1e-12);
        assert_eq!(report.rows()[3], (report.psnr_avg(), report.ssim_avg()));
    }

    #[test]
    fn average_row_is_appended_last() {
        let report = report(&[(30.0, 0.8), (20.0, 0.6)]);
        let rows = report.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], (30.0, 0.8));
        assert!((rows[2].0 - 25.0).abs() < 1e-12);
        assert_eq!(
            report.results_text(),
            "30.0000 0.8000\n20.0000 0.6000\n25.0000 0.7000\n"
        );
    }

    #[test]
    fn empty_report_averages_are_nan() {
        let report = DatasetReport::new("empty");
        assert!(report.psnr_avg().is_nan());
        assert!(report.ssim_avg().is_nan());
        assert_eq!(report.rows().len(), 1);
    }

    #[test]
    fn write_results_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set").join("results.txt");
        report(&[(10.0, 0.1)]).write_results(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
