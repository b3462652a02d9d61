//! Tab-separated statistics file
//!
//! One row per refiner construction, appended to a shared file so runs over
//! many inputs can be compared. The header is written only when the file is
//! empty.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::model::CalibrationModel;

/// File name used by the fallback locations when the primary path has none
pub const DEFAULT_STATS_FILE_NAME: &str = "mzrefine_stats.tsv";

/// Column headers, in row order
pub const STATS_HEADER: [&str; 16] = [
    "ThresholdScore",
    "ThresholdValue",
    "ExcludedByScore",
    "ExcludedByMassError",
    "MS1Included",
    "MS1Method",
    "MS1StDev",
    "MS1Tolerance",
    "MS1MAD",
    "MS1MADTolerance",
    "MS2Included",
    "MS2Method",
    "MS2StDev",
    "MS2Tolerance",
    "MS2MAD",
    "MS2MADTolerance",
];

/// Errors writing the statistics file
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Neither the primary path nor any fallback could be opened
    #[error("Cannot open statistics file {path}: {source}")]
    Unwritable {
        /// The requested path
        path: PathBuf,
        /// Error from the last location tried
        #[source]
        source: std::io::Error,
    },

    /// I/O error after the file was opened
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Calibration summary of one level group
#[derive(Debug, Clone, PartialEq)]
pub struct LevelStats {
    /// Samples the model was fitted to
    pub included: usize,
    /// Model method name
    pub method: &'static str,
    /// Residual standard deviation, ppm
    pub stdev: f64,
    /// `3 × stdev`
    pub stdev_tolerance: f64,
    /// Residual MAD, ppm
    pub mad: f64,
    /// `MAD × 3 × 1.4826`
    pub mad_tolerance: f64,
}

impl LevelStats {
    /// Summarise a fitted model
    pub fn from_model(model: &CalibrationModel, included: usize) -> Self {
        Self {
            included,
            method: model.kind().method_name(),
            stdev: model.stdev(),
            stdev_tolerance: model.stdev_tolerance(),
            mad: model.mad(),
            mad_tolerance: model.mad_tolerance(),
        }
    }

    fn push_fields(&self, record: &mut Vec<String>) {
        record.push(self.included.to_string());
        record.push(self.method.to_string());
        record.push(self.stdev.to_string());
        record.push(self.stdev_tolerance.to_string());
        record.push(self.mad.to_string());
        record.push(self.mad_tolerance.to_string());
    }
}

/// One row of the statistics file
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    /// Name of the filter score
    pub threshold_score: String,
    /// Final threshold, as a description such as `<= 1e-10`
    pub threshold_value: String,
    /// Hits rejected by score
    pub excluded_by_score: usize,
    /// Hits rejected by the mass and ppm error gates
    pub excluded_by_mass_error: usize,
    /// Precursor (MS1) model summary
    pub ms1: LevelStats,
    /// Fragment (MS2) model summary
    pub ms2: LevelStats,
}

impl StatsRow {
    /// Fields in [`STATS_HEADER`] order
    pub fn record(&self) -> Vec<String> {
        let mut record = vec![
            self.threshold_score.clone(),
            self.threshold_value.clone(),
            self.excluded_by_score.to_string(),
            self.excluded_by_mass_error.to_string(),
        ];
        self.ms1.push_fields(&mut record);
        self.ms2.push_fields(&mut record);
        record
    }
}

/// Append a row to the statistics file.
///
/// When `path` cannot be opened the same file name is tried in the current
/// directory and then in the system temp directory. Returns the path written.
pub fn append_stats(path: &Path, row: &StatsRow) -> Result<PathBuf, ReportError> {
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATS_FILE_NAME));
    let mut fallbacks = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        fallbacks.push(cwd.join(&file_name));
    }
    fallbacks.push(std::env::temp_dir().join(&file_name));
    append_stats_with_fallbacks(path, &fallbacks, row)
}

/// Append a row, trying `path` then each fallback in order
pub fn append_stats_with_fallbacks(
    path: &Path,
    fallbacks: &[PathBuf],
    row: &StatsRow,
) -> Result<PathBuf, ReportError> {
    let mut last_error = None;
    for candidate in std::iter::once(path).chain(fallbacks.iter().map(PathBuf::as_path)) {
        match OpenOptions::new().create(true).append(true).open(candidate) {
            Ok(file) => {
                if candidate != path {
                    warn!(
                        "Could not open statistics file {}, writing to {} instead",
                        path.display(),
                        candidate.display()
                    );
                }
                write_row(file, row)?;
                info!("Appended statistics to {}", candidate.display());
                return Ok(candidate.to_path_buf());
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(ReportError::Unwritable {
        path: path.to_path_buf(),
        source: last_error.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no location to try")),
    })
}

fn write_row(file: File, row: &StatsRow) -> Result<(), ReportError> {
    let is_new = file.metadata()?.len() == 0;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(file);
    if is_new {
        writer.write_record(STATS_HEADER)?;
    }
    writer.write_record(row.record())?;
    writer.flush()?;
    Ok(())
}
