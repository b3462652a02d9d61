use crate::spectrum::SourceError;

use super::range::RangeSyntaxError;
use super::report::ReportError;

/// Errors that abort refiner construction
#[derive(Debug, thiserror::Error)]
pub enum RefinerError {
    /// Too few identifications survived filtering to estimate a shift
    #[error("Insufficient data: {found} identifications passed the threshold, at least {required} are required")]
    InsufficientData {
        /// Samples kept after the last relaxation pass
        found: usize,
        /// Global-shift floor
        required: usize,
    },

    /// No instrument configuration ends in a high-resolution analyzer
    #[error("No high-resolution data in input")]
    NoHighResData,

    /// The MS1 ppm error histogram has no usable peak near its median
    #[error("No significant peak in the ppm error histogram (median {median_ppm} ppm)")]
    NoSignificantPeak {
        /// Median ppm error of the rejected distribution
        median_ppm: f64,
    },

    /// Malformed threshold range expression
    #[error("Range syntax error: {0}")]
    RangeSyntax(#[from] RangeSyntaxError),

    /// The progress callback asked to stop
    #[error("Cancelled during {stage}")]
    Cancelled {
        /// Construction stage that was running
        stage: &'static str,
    },

    /// Error reading spectra or identifications
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Error writing the statistics file
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}
