//! # m/z refinement
//!
//! [`MzRefiner`] wraps a spectrum collection and recalibrates the m/z values
//! of every spectrum read through it. Construction does all the work:
//!
//! 1. check that the collection holds high-resolution data at all
//! 2. turn identifications that pass a score threshold into precursor mass
//!    error samples, relaxing the threshold if too few survive
//! 3. read scan times, MS levels and resolution from the spectra, and match
//!    fragment ions of MS2 spectra for a second sample pool
//! 4. fit a global shift and, with enough samples, shifts binned by scan time
//!    and by m/z; keep the one that reduces the spread most
//! 5. record provenance and optionally append a statistics row
//!
//! After construction the refiner is immutable. Reads apply the chosen
//! models without caching, so concurrent readers need no locking.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mzrefine::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let spectra = InMemorySpectrumList::from_json_file("run.spectra.json")?;
//! let idents = IdentificationSet::from_json_file("run.idents.json")?;
//! let refiner = MzRefiner::new(spectra, &idents, &RefinerConfig::default())?;
//! let calibrated = refiner.spectrum(0, true)?;
//! println!("{} peaks", calibrated.peak_count());
//! # Ok(())
//! # }
//! ```

mod adjuster;
mod config;
mod enrich;
mod error;
mod filter;
mod fragments;
mod ingest;
mod isotope;
pub mod model;
mod progress;
mod range;
mod report;
mod sample;
mod selector;
pub mod stats;

use std::path::PathBuf;

use log::info;

use crate::controlled_vocabulary::ms_terms;
use crate::identification::{FragmentMassCalculator, IdentificationSource};
use crate::metadata::{InstrumentConfiguration, ProcessingHistory, ProcessingStep};
use crate::spectrum::{SourceError, Spectrum, SpectrumSource};

pub use adjuster::{any_high_res, spectrum_is_high_res, ValueAdjuster};
pub use config::{RefinerConfig, ThresholdSpec, MAX_ISOTOPE_SCREEN_DA};
pub use enrich::{enrich, EnrichOptions, Enrichment};
pub use error::RefinerError;
pub use filter::{ScoreSelector, ScoreThreshold};
pub use fragments::{ion_types_for, match_fragments, PeakIndex};
pub use ingest::{
    ingest, IngestCounts, Ingestion, MassErrorGates, MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT,
    MINIMUM_RESULTS_FOR_GLOBAL_SHIFT,
};
pub use isotope::try_correct as try_isotope_correction;
pub use model::{CalibrationModel, ModelKind};
pub use progress::{Flow, Progress, ProgressReporter, Stage};
pub use range::{parse_range, RangeSyntaxError, ScoreRange};
pub use report::{append_stats, append_stats_with_fallbacks, LevelStats, ReportError, StatsRow, STATS_HEADER};
pub use sample::{ErrorSample, Identification};
pub use selector::{preferred_dependency, select_fragment_model, select_model, IMPROVEMENT_THRESHOLD};

/// Software name recorded when the collection's history names none
pub const SOFTWARE_NAME: &str = "mzrefine";

/// Provenance parameter names
pub mod provenance {
    /// Path of the identification source
    pub const IDENTIFICATION_FILE: &str = "Identification File";
    /// Filter score name
    pub const FILTER_SCORE_NAME: &str = "Filter score name";
    /// Final filter threshold description
    pub const FILTER_SCORE_THRESHOLD: &str = "Filter score threshold";
    /// Shift dependency of the chosen model
    pub const SHIFT_DEPENDENCY: &str = "Shift dependency";
    /// Applied shift or shift range
    pub const SHIFT_RANGE: &str = "Shift range";
    /// Global median ppm error
    pub const GLOBAL_MEDIAN_ERROR: &str = "Global Median Mass Measurement Error (PPM)";
}

/// What construction found and decided
#[derive(Debug, Clone)]
pub struct CalibrationSummary {
    /// Path reported by the identification source
    pub identification_path: String,
    /// Threshold of the final ingestion pass
    pub threshold: ScoreThreshold,
    /// Rejection counters of the final ingestion pass
    pub counts: IngestCounts,
    /// Precursor samples the MS1 model was fitted to
    pub ms1_samples: usize,
    /// Fragment samples collected from MS2 spectra
    pub ms2_samples: usize,
    /// Where the statistics row was written, if anywhere
    pub stats_written_to: Option<PathBuf>,
}

impl CalibrationSummary {
    /// Statistics file row for this construction
    pub fn stats_row(&self, adjuster: &ValueAdjuster) -> StatsRow {
        StatsRow {
            threshold_score: self.threshold.score_name().to_string(),
            threshold_value: self.threshold.description(),
            excluded_by_score: self.counts.rejected_by_score,
            excluded_by_mass_error: self.counts.rejected_by_mass_error,
            ms1: LevelStats::from_model(adjuster.ms1_model(), self.ms1_samples),
            ms2: LevelStats::from_model(adjuster.ms2_model(), self.ms2_samples),
        }
    }
}

/// A recalibrating view over a spectrum collection
#[derive(Debug)]
pub struct MzRefiner<S: SpectrumSource> {
    inner: S,
    adjuster: ValueAdjuster,
    processing_history: ProcessingHistory,
    summary: CalibrationSummary,
}

impl<S: SpectrumSource> MzRefiner<S> {
    /// Build a refiner without fragment matching or progress callbacks
    pub fn new(
        inner: S,
        identifications: &dyn IdentificationSource,
        config: &RefinerConfig,
    ) -> Result<Self, RefinerError> {
        let mut progress = ProgressReporter::silent().with_log_interval(config.progress_interval);
        Self::with_options(inner, identifications, config, None, &mut progress)
    }

    /// Build a refiner.
    ///
    /// `fragments` enables the MS2 sample pool; without it MS2 peak lists use
    /// the MS1 model. `progress` may cancel construction.
    pub fn with_options(
        inner: S,
        identifications: &dyn IdentificationSource,
        config: &RefinerConfig,
        fragments: Option<&dyn FragmentMassCalculator>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<Self, RefinerError> {
        if !config.assume_high_res && !any_high_res(inner.instrument_configurations()) {
            return Err(RefinerError::NoHighResData);
        }

        let threshold = config.score_threshold(identifications.analysis_software())?;
        let gates = MassErrorGates {
            isotope_screen_da: config.effective_isotope_screen(),
            isotope_filter_da: config.isotope_filter_da,
            ppm_error_limit: config.ppm_error_limit,
        };
        let Ingestion {
            mut samples,
            threshold,
            counts,
        } = ingest(identifications, threshold, &gates, progress)?;

        let enrichment = enrich(
            &mut samples,
            &inner,
            EnrichOptions {
                assume_high_res: config.assume_high_res,
                match_fragments: config.refines_level(2),
                fragments,
            },
            progress,
        )?;

        let ms1 = select_model(&samples, true, progress)?;
        let ms2 = select_fragment_model(&enrichment.fragment_samples, &ms1, progress)?;

        let mut processing_history = inner.processing_history().clone();
        let step = provenance_step(
            &processing_history,
            identifications.source_path(),
            &threshold,
            &ms1,
        );
        processing_history.add_step(step);

        let adjuster = ValueAdjuster::new(ms1, ms2, config.ms_levels.clone(), config.assume_high_res);
        let mut summary = CalibrationSummary {
            identification_path: identifications.source_path().to_string(),
            threshold,
            counts,
            ms1_samples: samples.len(),
            ms2_samples: enrichment.fragment_samples.len(),
            stats_written_to: None,
        };
        if let Some(path) = &config.stats_path {
            summary.stats_written_to = Some(append_stats(path, &summary.stats_row(&adjuster))?);
        }

        info!(
            "m/z refiner ready: MS1 {}, MS2 {}",
            adjuster.ms1_model().kind(),
            adjuster.ms2_model().kind()
        );
        Ok(Self {
            inner,
            adjuster,
            processing_history,
            summary,
        })
    }

    /// Read a spectrum with its m/z values recalibrated
    pub fn spectrum(&self, index: usize, with_binary: bool) -> Result<Spectrum, SourceError> {
        let mut spectrum = self.inner.spectrum(index, with_binary)?;
        self.adjuster.adjust(&mut spectrum, &self.inner)?;
        Ok(spectrum)
    }

    /// The wrapped collection, unmodified
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Release the wrapped collection
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Processing history including the calibration step
    pub fn processing_history(&self) -> &ProcessingHistory {
        &self.processing_history
    }

    /// Model applied to MS1 data and precursor m/z values
    pub fn ms1_model(&self) -> &CalibrationModel {
        self.adjuster.ms1_model()
    }

    /// Model applied to MSn peak lists
    pub fn ms2_model(&self) -> &CalibrationModel {
        self.adjuster.ms2_model()
    }

    /// The read-time adjuster
    pub fn adjuster(&self) -> &ValueAdjuster {
        &self.adjuster
    }

    /// Construction summary
    pub fn summary(&self) -> &CalibrationSummary {
        &self.summary
    }

    /// Statistics row describing this refiner
    pub fn stats_row(&self) -> StatsRow {
        self.summary.stats_row(&self.adjuster)
    }
}

impl<S: SpectrumSource> SpectrumSource for MzRefiner<S> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn spectrum(&self, index: usize, with_binary: bool) -> Result<Spectrum, SourceError> {
        MzRefiner::spectrum(self, index, with_binary)
    }

    fn index_of(&self, native_id: &str) -> Option<usize> {
        self.inner.index_of(native_id)
    }

    fn instrument_configurations(&self) -> &[InstrumentConfiguration] {
        self.inner.instrument_configurations()
    }

    fn processing_history(&self) -> &ProcessingHistory {
        &self.processing_history
    }
}

fn provenance_step(
    history: &ProcessingHistory,
    identification_path: &str,
    threshold: &ScoreThreshold,
    ms1: &CalibrationModel,
) -> ProcessingStep {
    let software = history.first_software().unwrap_or(SOFTWARE_NAME).to_string();
    let mut step = ProcessingStep::new(history.next_order(), software, ms_terms::mz_calibration())
        .with_param(provenance::IDENTIFICATION_FILE, identification_path)
        .with_param(provenance::FILTER_SCORE_NAME, threshold.score_name())
        .with_param(provenance::FILTER_SCORE_THRESHOLD, threshold.description())
        .with_param(provenance::SHIFT_DEPENDENCY, ms1.kind().shift_label())
        .with_param(provenance::SHIFT_RANGE, ms1.shift_range())
        .with_param(provenance::GLOBAL_MEDIAN_ERROR, ms1.global_shift());
    step.version = Some(env!("CARGO_PKG_VERSION").to_string());
    step.timestamp = Some(chrono::Utc::now().to_rfc3339());
    step
}
