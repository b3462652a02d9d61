//! Refiner settings
//!
//! Everything a caller can tune about construction: the score filter and its
//! relaxation, enabled MS levels and the precursor mass error gates.

use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use super::filter::{ScoreSelector, ScoreThreshold};
use super::range::RangeSyntaxError;

/// Largest isotope screening threshold that is still honoured, in Da
pub const MAX_ISOTOPE_SCREEN_DA: f64 = 0.20;

/// Score bounds, as a range expression or as explicit values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdSpec {
    /// Range expression such as `-1e-10`, `5-` or `[1,5]`
    Range {
        /// The expression
        range: String,
    },
    /// Explicit bounds; a bound is ignored unless its flag is set
    Bounds {
        /// Lower bound
        #[serde(default)]
        min: f64,
        /// Upper bound
        #[serde(default)]
        max: f64,
        /// Apply the lower bound
        #[serde(default)]
        use_min: bool,
        /// Apply the upper bound
        #[serde(default)]
        use_max: bool,
    },
}

impl Default for ThresholdSpec {
    fn default() -> Self {
        ThresholdSpec::Range {
            range: "-1e-10".to_string(),
        }
    }
}

/// Refiner construction options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    /// Score to filter identifications on: a short name, CV name or accession
    pub score_name: String,

    /// Score bounds
    pub threshold: ThresholdSpec,

    /// Multiplier applied to the bounds on each relaxation step (0 disables)
    pub step: f64,

    /// Maximum number of relaxation steps
    pub max_steps: u32,

    /// MS levels whose spectra are recalibrated
    pub ms_levels: Vec<u8>,

    /// Treat every spectrum as high resolution regardless of its analyzer
    pub assume_high_res: bool,

    /// Mass errors beyond this are checked for isotope miscalls, in Da
    pub isotope_screen_da: f64,

    /// Samples whose mass error is not below this are dropped, in Da
    pub isotope_filter_da: f64,

    /// Samples whose ppm error exceeds this magnitude are dropped
    pub ppm_error_limit: f64,

    /// Log progress every this many identification results (0 disables)
    pub progress_interval: usize,

    /// Where to append the statistics row, if anywhere
    pub stats_path: Option<PathBuf>,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            score_name: "MS-GF:SpecEValue".to_string(),
            threshold: ThresholdSpec::default(),
            step: 0.0,
            max_steps: 0,
            ms_levels: vec![1, 2],
            assume_high_res: false,
            isotope_screen_da: 0.15,
            isotope_filter_da: 0.20,
            ppm_error_limit: 50.0,
            progress_interval: 1000,
            stats_path: None,
        }
    }
}

impl RefinerConfig {
    /// Whether spectra of this MS level are recalibrated
    pub fn refines_level(&self, level: u8) -> bool {
        self.ms_levels.contains(&level)
    }

    /// Isotope screening threshold, capped at [`MAX_ISOTOPE_SCREEN_DA`]
    pub fn effective_isotope_screen(&self) -> f64 {
        if self.isotope_screen_da > MAX_ISOTOPE_SCREEN_DA {
            warn!(
                "Isotope screening threshold {} Da is too permissive, using {} Da",
                self.isotope_screen_da, MAX_ISOTOPE_SCREEN_DA
            );
            return MAX_ISOTOPE_SCREEN_DA;
        }
        self.isotope_screen_da
    }

    /// Build the initial score threshold for identifications reported by `software`
    pub fn score_threshold(&self, software: Option<&str>) -> Result<ScoreThreshold, RangeSyntaxError> {
        let selector = ScoreSelector::resolve(software, &self.score_name);
        match &self.threshold {
            ThresholdSpec::Range { range } => {
                ScoreThreshold::from_expression(selector, range, self.step, self.max_steps)
            }
            ThresholdSpec::Bounds {
                min,
                max,
                use_min,
                use_max,
            } => Ok(ScoreThreshold::from_bounds(
                selector,
                *min,
                *max,
                *use_min,
                *use_max,
                self.step,
                self.max_steps,
            )),
        }
    }
}
