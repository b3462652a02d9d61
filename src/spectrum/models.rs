//! Spectrum data models
//!
//! Spectrum metadata is kept as CV terms with string values, mirroring mzML,
//! so the refiner can rewrite the m/z-bearing fields in place.

use serde::{Deserialize, Serialize};

use crate::controlled_vocabulary::{accession, CvParamList, UserParam};

/// Represents a single spectrum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Spectrum index (0-based)
    pub index: usize,

    /// Native spectrum ID
    pub id: String,

    /// Spectrum-level CV parameters (ms level, base peak m/z, observed m/z range)
    #[serde(default)]
    pub cv_params: CvParamList,

    /// Scans that contributed to this spectrum
    #[serde(default)]
    pub scans: Vec<Scan>,

    /// Precursor information (for MS2+ spectra)
    #[serde(default)]
    pub precursors: Vec<Precursor>,

    /// m/z array (decoded)
    #[serde(default)]
    pub mz_array: Vec<f64>,

    /// Intensity array (decoded)
    #[serde(default)]
    pub intensity_array: Vec<f64>,
}

impl Spectrum {
    /// MS level (1 for MS1, 2 for MS2, etc.)
    pub fn ms_level(&self) -> Option<u8> {
        self.cv_params
            .get(accession::MS_LEVEL)?
            .value_as_i64()
            .and_then(|level| u8::try_from(level).ok())
    }

    /// Earliest scan start time over all scans, in seconds
    pub fn scan_start_time(&self) -> Option<f64> {
        self.scans
            .iter()
            .filter_map(|scan| scan.cv_params.get(accession::SCAN_START_TIME)?.time_in_seconds())
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Get the scan number from the native ID
    pub fn scan_number(&self) -> Option<usize> {
        scan_number_from_native_id(&self.id).or(Some(self.index + 1))
    }

    /// Get the number of peaks
    pub fn peak_count(&self) -> usize {
        self.mz_array.len()
    }

    /// Drop the binary arrays, keeping metadata only
    pub fn strip_binary(&mut self) {
        self.mz_array = Vec::new();
        self.intensity_array = Vec::new();
    }
}

/// Parse a scan number out of a native ID.
///
/// Common formats:
/// "scan=12345",
/// "controllerType=0 controllerNumber=1 scan=12345",
/// "S12345"
pub fn scan_number_from_native_id(id: &str) -> Option<usize> {
    if let Some(pos) = id.find("scan=") {
        let start = pos + 5;
        let end = id[start..]
            .find(|c: char| !c.is_ascii_digit())
            .map(|i| start + i)
            .unwrap_or(id.len());
        id[start..end].parse().ok()
    } else if let Some(rest) = id.strip_prefix('S') {
        rest.parse().ok()
    } else {
        id.trim().parse().ok()
    }
}

/// A single scan of a spectrum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    /// Instrument configuration used to record this scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_configuration_ref: Option<String>,

    /// Scan-level CV parameters (scan start time, ...)
    #[serde(default)]
    pub cv_params: CvParamList,

    /// Vendor-specific parameters
    #[serde(default)]
    pub user_params: Vec<UserParam>,
}

/// Precursor ion information for MS2+ spectra
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Precursor {
    /// Reference to the precursor spectrum ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spectrum_ref: Option<String>,

    /// Set when the precursor spectrum lives in another file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_source_file_ref: Option<String>,

    /// Isolation window CV parameters
    #[serde(default)]
    pub isolation_window: CvParamList,

    /// Selected ions, one CV parameter list each
    #[serde(default)]
    pub selected_ions: Vec<CvParamList>,

    /// Activation CV parameters (dissociation method, collision energy)
    #[serde(default)]
    pub activation: CvParamList,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlled_vocabulary::{ms_terms, unit, CvTerm};

    #[test]
    fn test_scan_number_formats() {
        assert_eq!(
            scan_number_from_native_id("controllerType=0 controllerNumber=1 scan=12345"),
            Some(12345)
        );
        assert_eq!(scan_number_from_native_id("S77"), Some(77));
        assert_eq!(scan_number_from_native_id("index=3 spectrum"), None);

        let spectrum = Spectrum {
            index: 4,
            id: "merged=4".to_string(),
            ..Default::default()
        };
        assert_eq!(spectrum.scan_number(), Some(5));
    }

    #[test]
    fn test_earliest_scan_start_time() {
        let spectrum = Spectrum {
            scans: vec![
                Scan {
                    cv_params: CvParamList::new().with(ms_terms::scan_start_time(30.0)),
                    ..Default::default()
                },
                Scan {
                    cv_params: CvParamList::new().with(
                        CvTerm::new(accession::SCAN_START_TIME, "scan start time")
                            .with_value(0.25)
                            .with_unit(unit::MINUTE, "minute"),
                    ),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(spectrum.scan_start_time(), Some(15.0));
    }

    #[test]
    fn test_ms_level() {
        let spectrum = Spectrum {
            cv_params: CvParamList::new().with(ms_terms::ms_level(2)),
            ..Default::default()
        };
        assert_eq!(spectrum.ms_level(), Some(2));
        assert_eq!(Spectrum::default().ms_level(), None);
    }
}
