//! # HUPO-PSI Mass Spectrometry Controlled Vocabulary
//!
//! Type-safe access to the PSI-MS controlled vocabulary (CV) terms that the
//! m/z refiner reads from and writes back into spectrum metadata.
//!
//! Spectrum metadata values (base peak m/z, selected ion m/z, ...) are carried
//! as CV terms with string values, the way they appear in mzML. The refiner
//! rewrites those values in place, so terms expose typed getters and setters.
//!
//! ## Reference
//! - OBO file: https://raw.githubusercontent.com/HUPO-PSI/psi-ms-CV/master/psi-ms.obo
//! - Documentation: https://github.com/HUPO-PSI/psi-ms-CV

use serde::{Deserialize, Serialize};
use std::fmt;

/// A controlled vocabulary term with its accession and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CvTerm {
    /// CV accession (e.g., "MS:1000040")
    pub accession: String,
    /// Human-readable name
    pub name: String,
    /// Optional value associated with the term
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Optional unit accession for the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_accession: Option<String>,
    /// Optional unit name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
}

impl CvTerm {
    /// Create a new CV term with accession and name
    pub fn new(accession: &str, name: &str) -> Self {
        Self {
            accession: accession.to_string(),
            name: name.to_string(),
            value: None,
            unit_accession: None,
            unit_name: None,
        }
    }

    /// Add a value to the CV term
    pub fn with_value(mut self, value: impl ToString) -> Self {
        self.value = Some(value.to_string());
        self
    }

    /// Add a unit to the CV term value
    pub fn with_unit(mut self, unit_accession: &str, unit_name: &str) -> Self {
        self.unit_accession = Some(unit_accession.to_string());
        self.unit_name = Some(unit_name.to_string());
        self
    }

    /// Get the value as f64 if possible
    pub fn value_as_f64(&self) -> Option<f64> {
        self.value.as_ref()?.trim().parse().ok()
    }

    /// Get the value as i64 if possible
    pub fn value_as_i64(&self) -> Option<i64> {
        self.value.as_ref()?.trim().parse().ok()
    }

    /// Overwrite the value, keeping the unit
    pub fn set_value(&mut self, value: impl ToString) {
        self.value = Some(value.to_string());
    }

    /// Interpret the value as a time and convert it to seconds.
    ///
    /// Values without a unit, or with an unknown unit, are taken as seconds.
    pub fn time_in_seconds(&self) -> Option<f64> {
        let value = self.value_as_f64()?;
        match self.unit_accession.as_deref() {
            Some(unit::MINUTE) => Some(value * 60.0),
            Some(unit::MILLISECOND) => Some(value / 1000.0),
            _ => Some(value),
        }
    }
}

impl fmt::Display for CvTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "[{}: {}={}]", self.accession, self.name, v),
            None => write!(f, "[{}: {}]", self.accession, self.name),
        }
    }
}

/// A free-text parameter (mzML `userParam`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserParam {
    /// Parameter name
    pub name: String,
    /// Parameter value
    #[serde(default)]
    pub value: String,
}

impl UserParam {
    /// Create a new user parameter
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }

    /// Get the value as f64 if possible
    pub fn value_as_f64(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }
}

/// Accessions the refiner looks up by value
pub mod accession {
    /// MS level
    pub const MS_LEVEL: &str = "MS:1000511";
    /// Scan start time
    pub const SCAN_START_TIME: &str = "MS:1000016";
    /// Base peak m/z
    pub const BASE_PEAK_MZ: &str = "MS:1000504";
    /// Lowest observed m/z
    pub const LOWEST_OBSERVED_MZ: &str = "MS:1000528";
    /// Highest observed m/z
    pub const HIGHEST_OBSERVED_MZ: &str = "MS:1000527";
    /// Selected ion m/z
    pub const SELECTED_ION_MZ: &str = "MS:1000744";
    /// Isolation window target m/z
    pub const ISOLATION_WINDOW_TARGET_MZ: &str = "MS:1000827";
    /// m/z calibration (data transformation)
    pub const MZ_CALIBRATION: &str = "MS:1000780";

    /// Orbitrap analyzer
    pub const ORBITRAP: &str = "MS:1000484";
    /// Time-of-flight analyzer
    pub const TIME_OF_FLIGHT: &str = "MS:1000084";
    /// Fourier transform ion cyclotron resonance mass spectrometer
    pub const FT_ICR: &str = "MS:1000079";
    /// Stored waveform inverse fourier transform
    pub const SWIFT: &str = "MS:1000284";
    /// Ion trap analyzer
    pub const ION_TRAP: &str = "MS:1000264";
    /// Quadrupole analyzer
    pub const QUADRUPOLE: &str = "MS:1000081";

    /// Collision-induced dissociation
    pub const CID: &str = "MS:1000133";
    /// Beam-type collision-induced dissociation (HCD)
    pub const HCD: &str = "MS:1000422";
    /// Trap-type collision-induced dissociation
    pub const TRAP_TYPE_CID: &str = "MS:1002472";
    /// Higher energy beam-type collision-induced dissociation
    pub const HIGHER_ENERGY_CID: &str = "MS:1002481";
    /// Electron transfer dissociation
    pub const ETD: &str = "MS:1000598";
    /// Electron capture dissociation
    pub const ECD: &str = "MS:1000250";
}

/// Unit ontology accessions
pub mod unit {
    /// UO:0000010 - second
    pub const SECOND: &str = "UO:0000010";
    /// UO:0000031 - minute
    pub const MINUTE: &str = "UO:0000031";
    /// UO:0000028 - millisecond
    pub const MILLISECOND: &str = "UO:0000028";
}

/// Vendor trailer carrying a refined monoisotopic m/z on Thermo scans
pub const THERMO_MONOISOTOPIC_MZ: &str = "[Thermo Trailer Extra]Monoisotopic M/Z:";

/// Common MS CV terms used by the refiner
pub mod ms_terms {
    use super::{accession, unit, CvTerm};

    /// MS:1000511 - ms level
    pub fn ms_level(level: u8) -> CvTerm {
        CvTerm::new(accession::MS_LEVEL, "ms level").with_value(level)
    }

    /// MS:1000016 - scan start time
    pub fn scan_start_time(time_seconds: f64) -> CvTerm {
        CvTerm::new(accession::SCAN_START_TIME, "scan start time")
            .with_value(time_seconds)
            .with_unit(unit::SECOND, "second")
    }

    /// MS:1000504 - base peak m/z
    pub fn base_peak_mz(mz: f64) -> CvTerm {
        CvTerm::new(accession::BASE_PEAK_MZ, "base peak m/z")
            .with_value(mz)
            .with_unit("MS:1000040", "m/z")
    }

    /// MS:1000528 - lowest observed m/z
    pub fn lowest_observed_mz(mz: f64) -> CvTerm {
        CvTerm::new(accession::LOWEST_OBSERVED_MZ, "lowest observed m/z")
            .with_value(mz)
            .with_unit("MS:1000040", "m/z")
    }

    /// MS:1000527 - highest observed m/z
    pub fn highest_observed_mz(mz: f64) -> CvTerm {
        CvTerm::new(accession::HIGHEST_OBSERVED_MZ, "highest observed m/z")
            .with_value(mz)
            .with_unit("MS:1000040", "m/z")
    }

    /// MS:1000744 - selected ion m/z
    pub fn selected_ion_mz(mz: f64) -> CvTerm {
        CvTerm::new(accession::SELECTED_ION_MZ, "selected ion m/z")
            .with_value(mz)
            .with_unit("MS:1000040", "m/z")
    }

    /// MS:1000827 - isolation window target m/z
    pub fn isolation_window_target_mz(mz: f64) -> CvTerm {
        CvTerm::new(accession::ISOLATION_WINDOW_TARGET_MZ, "isolation window target m/z")
            .with_value(mz)
            .with_unit("MS:1000040", "m/z")
    }

    /// MS:1000780 - m/z calibration
    pub fn mz_calibration() -> CvTerm {
        CvTerm::new(accession::MZ_CALIBRATION, "m/z calibration")
    }

    /// MS:1000484 - orbitrap
    pub fn orbitrap() -> CvTerm {
        CvTerm::new(accession::ORBITRAP, "orbitrap")
    }

    /// MS:1000084 - time-of-flight
    pub fn tof() -> CvTerm {
        CvTerm::new(accession::TIME_OF_FLIGHT, "time-of-flight")
    }

    /// MS:1000264 - ion trap
    pub fn ion_trap() -> CvTerm {
        CvTerm::new(accession::ION_TRAP, "ion trap")
    }

    /// MS:1000081 - quadrupole
    pub fn quadrupole() -> CvTerm {
        CvTerm::new(accession::QUADRUPOLE, "quadrupole")
    }

    /// MS:1000133 - collision-induced dissociation
    pub fn cid() -> CvTerm {
        CvTerm::new(accession::CID, "collision-induced dissociation")
    }

    /// MS:1000422 - beam-type collision-induced dissociation (HCD)
    pub fn hcd() -> CvTerm {
        CvTerm::new(accession::HCD, "beam-type collision-induced dissociation")
    }

    /// MS:1000598 - electron transfer dissociation
    pub fn etd() -> CvTerm {
        CvTerm::new(accession::ETD, "electron transfer dissociation")
    }
}

/// A parameter list containing multiple CV terms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CvParamList {
    params: Vec<CvTerm>,
}

impl CvParamList {
    /// Create a new empty parameter list
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a CV term to the list
    pub fn add(&mut self, term: CvTerm) {
        self.params.push(term);
    }

    /// Add a CV term to the list (builder pattern)
    pub fn with(mut self, term: CvTerm) -> Self {
        self.add(term);
        self
    }

    /// Get a CV term by accession
    pub fn get(&self, accession: &str) -> Option<&CvTerm> {
        self.params.iter().find(|t| t.accession == accession)
    }

    /// Get a mutable CV term by accession
    pub fn get_mut(&mut self, accession: &str) -> Option<&mut CvTerm> {
        self.params.iter_mut().find(|t| t.accession == accession)
    }

    /// Check whether a term with this accession is present
    pub fn contains(&self, accession: &str) -> bool {
        self.get(accession).is_some()
    }

    /// Get the numeric value of a term by accession
    pub fn value_as_f64(&self, accession: &str) -> Option<f64> {
        self.get(accession)?.value_as_f64()
    }

    /// Iterate over all CV terms
    pub fn iter(&self) -> impl Iterator<Item = &CvTerm> {
        self.params.iter()
    }

    /// Get the number of CV terms
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl FromIterator<CvTerm> for CvParamList {
    fn from_iter<I: IntoIterator<Item = CvTerm>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cv_term_creation() {
        let term = ms_terms::ms_level(2);
        assert_eq!(term.accession, "MS:1000511");
        assert_eq!(term.value, Some("2".to_string()));
        assert_eq!(term.value_as_i64(), Some(2));
    }

    #[test]
    fn test_time_units() {
        let seconds = ms_terms::scan_start_time(90.0);
        assert_eq!(seconds.time_in_seconds(), Some(90.0));

        let minutes = CvTerm::new(accession::SCAN_START_TIME, "scan start time")
            .with_value(1.5)
            .with_unit(unit::MINUTE, "minute");
        assert_eq!(minutes.time_in_seconds(), Some(90.0));
    }

    #[test]
    fn test_cv_param_list_mutation() {
        let mut list = CvParamList::new()
            .with(ms_terms::ms_level(2))
            .with(ms_terms::base_peak_mz(445.12));

        assert_eq!(list.len(), 2);
        if let Some(term) = list.get_mut(accession::BASE_PEAK_MZ) {
            term.set_value(445.11);
        }
        assert_eq!(list.value_as_f64(accession::BASE_PEAK_MZ), Some(445.11));
        assert!(!list.contains(accession::SELECTED_ION_MZ));
    }
}
