//! # mzrefine - m/z recalibration from peptide identifications
//!
//! `mzrefine` corrects systematic m/z errors in high-resolution mass
//! spectrometry data. It compares the theoretical m/z of confidently
//! identified peptides with the m/z the instrument measured, models the
//! remaining error, and applies the correction to every spectrum read
//! through it.
//!
//! ## Key Features
//!
//! - **Score-driven sample selection**: identifications are filtered by a
//!   search-engine score with automatic threshold relaxation when too few
//!   survive.
//!
//! - **Isotope miscall repair**: precursors picked on the wrong isotope peak
//!   are moved back to the monoisotopic peak before they are used.
//!
//! - **Three models**: a global ppm shift, or shifts binned by scan time or
//!   by m/z, chosen by how much each one reduces the spread of the errors.
//!
//! - **Separate MS1 and MS2 models**: fragment ions matched in MS2 spectra
//!   give MS2 peak lists a model of their own.
//!
//! - **Provenance**: the calibration is recorded as a processing step with
//!   HUPO-PSI CV terms, and a tab-separated statistics file can collect
//!   one row per run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mzrefine::prelude::*;
//!
//! let spectra = InMemorySpectrumList::from_json_file("run.spectra.json")?;
//! let idents = IdentificationSet::from_json_file("run.idents.json")?;
//!
//! let config = RefinerConfig {
//!     score_name: "SpecEValue".to_string(),
//!     ..Default::default()
//! };
//! let refiner = MzRefiner::new(spectra, &idents, &config)?;
//!
//! println!("MS1 model: {}", refiner.ms1_model().kind());
//! let spectrum = refiner.spectrum(0, true)?;
//! println!("first peak at {:?}", spectrum.mz_array.first());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`controlled_vocabulary`]: HUPO-PSI MS controlled vocabulary terms
//! - [`metadata`]: instrument configurations and processing history
//! - [`spectrum`]: spectra and the [`spectrum::SpectrumSource`] abstraction
//! - [`identification`]: peptide identifications, score names, fragment masses
//! - [`refiner`]: sample ingestion, model fitting and the [`refiner::MzRefiner`] view

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
// Allow some patterns common in scientific code
#![allow(clippy::too_many_arguments)]

pub mod controlled_vocabulary;
pub mod identification;
pub mod metadata;
pub mod refiner;
pub mod spectrum;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::controlled_vocabulary::{ms_terms, CvParamList, CvTerm, UserParam};
    pub use crate::identification::{
        FragmentMassCalculator, IdentificationSet, IdentificationSource, IonType,
        PrecomputedFragments,
    };
    pub use crate::metadata::{InstrumentConfiguration, ProcessingHistory, ProcessingStep};
    pub use crate::refiner::{
        CalibrationModel, ErrorSample, Flow, ModelKind, MzRefiner, Progress, ProgressReporter,
        RefinerConfig, RefinerError, Stage, ThresholdSpec,
    };
    pub use crate::spectrum::{InMemorySpectrumList, SourceError, Spectrum, SpectrumSource};
}
