//! Mass measurement error samples
//!
//! One record type serves both sample pools: precursor samples carry
//! identification metadata, fragment samples do not.

/// Identification attributes of a precursor sample
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    /// Scan number of the identified spectrum
    pub scan_id: usize,
    /// Native ID of the identified spectrum
    pub native_id: String,
    /// Hit rank (0 = unranked)
    pub rank: u32,
    /// Peptide with inline modification masses
    pub peptide: String,
    /// Number of residues
    pub peptide_length: usize,
    /// MS level of the identified spectrum, filled during enrichment
    pub ms_level: Option<u8>,
    /// Whether the identified spectrum was recorded at high resolution
    pub high_res: bool,
    /// Value of the filter score
    pub score_value: f64,
    /// Precursor charge
    pub charge: i32,
}

/// A calculated/experimental m/z pair and its errors
///
/// `mass_error` and `ppm_error` are derived from the m/z values on every
/// change and cannot be set directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSample {
    scan_time: f64,
    calc_mz: f64,
    exper_mz: f64,
    mass_error: f64,
    ppm_error: f64,
    identification: Option<Identification>,
}

impl ErrorSample {
    /// Create a sample; scan time in seconds
    pub fn new(calc_mz: f64, exper_mz: f64, scan_time: f64) -> Self {
        let mut sample = Self {
            scan_time,
            calc_mz,
            exper_mz,
            mass_error: 0.0,
            ppm_error: 0.0,
            identification: None,
        };
        sample.recompute();
        sample
    }

    /// Attach identification metadata (builder pattern)
    pub fn with_identification(mut self, identification: Identification) -> Self {
        self.identification = Some(identification);
        self
    }

    fn recompute(&mut self) {
        self.mass_error = self.exper_mz - self.calc_mz;
        self.ppm_error = (self.mass_error / self.calc_mz) * 1.0e6;
    }

    /// Move the experimental m/z by `delta`, recomputing both errors
    pub(crate) fn shift_exper_mz(&mut self, delta: f64) {
        self.exper_mz += delta;
        self.recompute();
    }

    pub(crate) fn set_scan_time(&mut self, scan_time: f64) {
        self.scan_time = scan_time;
    }

    pub(crate) fn identification_mut(&mut self) -> Option<&mut Identification> {
        self.identification.as_mut()
    }

    /// Scan start time in seconds
    pub fn scan_time(&self) -> f64 {
        self.scan_time
    }

    /// Theoretical m/z
    pub fn calc_mz(&self) -> f64 {
        self.calc_mz
    }

    /// Measured m/z
    pub fn exper_mz(&self) -> f64 {
        self.exper_mz
    }

    /// Experimental minus calculated m/z, in Da
    pub fn mass_error(&self) -> f64 {
        self.mass_error
    }

    /// Mass error relative to the calculated m/z, in ppm
    pub fn ppm_error(&self) -> f64 {
        self.ppm_error
    }

    /// Identification metadata, for precursor samples
    pub fn identification(&self) -> Option<&Identification> {
        self.identification.as_ref()
    }

    /// Scan number, when the sample came from an identification
    pub fn scan_id(&self) -> Option<usize> {
        self.identification.as_ref().map(|i| i.scan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_follow_mz() {
        let mut sample = ErrorSample::new(500.0, 500.005, 12.0);
        assert!((sample.mass_error() - 0.005).abs() < 1e-12);
        assert!((sample.ppm_error() - 10.0).abs() < 1e-6);

        sample.shift_exper_mz(-0.005);
        assert!(sample.mass_error().abs() < 1e-12);
        assert!(sample.ppm_error().abs() < 1e-6);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn errors_stay_consistent(calc in 100.0f64..3000.0, offset in -1.0f64..1.0, delta in -1.0f64..1.0) {
                let mut sample = ErrorSample::new(calc, calc + offset, 0.0);
                prop_assert_eq!(sample.mass_error(), sample.exper_mz() - sample.calc_mz());
                prop_assert_eq!(sample.ppm_error(), sample.mass_error() / sample.calc_mz() * 1.0e6);

                sample.shift_exper_mz(delta);
                prop_assert_eq!(sample.mass_error(), sample.exper_mz() - sample.calc_mz());
                prop_assert_eq!(sample.ppm_error(), sample.mass_error() / sample.calc_mz() * 1.0e6);
            }
        }
    }
}
