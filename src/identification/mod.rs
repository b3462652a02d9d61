//! # Peptide identifications
//!
//! Parsed search-engine results, score name resolution, and the theoretical
//! fragment mass interface used when matching MS2 peaks.

mod fragments;
mod models;
pub mod scores;

pub use fragments::{FragmentIon, FragmentMassCalculator, IonType, PrecomputedFragments};
pub use models::{
    IdentificationHit, IdentificationSet, IdentificationSource, Modification,
    SpectrumIdentificationResult,
};
pub use scores::{resolve_score, ScoreTerm};
