//! Identification data models
//!
//! These mirror the parts of mzIdentML the refiner consumes: per-spectrum
//! results holding ranked peptide hits with calculated/experimental m/z and
//! score parameters. Parsing the XML itself happens upstream.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::controlled_vocabulary::{CvParamList, UserParam};
use crate::spectrum::SourceError;

/// A modification at a residue position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    /// Residue position, 1-based; 0 is the N-terminus, `len + 1` the C-terminus
    pub location: usize,

    /// Monoisotopic mass delta in Da
    pub mass_delta: f64,
}

/// One candidate peptide-spectrum match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentificationHit {
    /// Rank among the hits for the spectrum (1 = best, 0 = unranked)
    #[serde(default)]
    pub rank: u32,

    /// Precursor charge state
    #[serde(default)]
    pub charge: i32,

    /// Theoretical m/z of the identified peptide
    pub calculated_mz: f64,

    /// Measured precursor m/z
    pub experimental_mz: f64,

    /// Unmodified peptide sequence
    #[serde(default)]
    pub peptide: String,

    /// Modifications on the peptide
    #[serde(default)]
    pub modifications: Vec<Modification>,

    /// Scores reported as CV parameters
    #[serde(default)]
    pub cv_params: CvParamList,

    /// Scores reported as free-text parameters
    #[serde(default)]
    pub user_params: Vec<UserParam>,
}

impl IdentificationHit {
    /// Number of residues in the peptide
    pub fn peptide_length(&self) -> usize {
        self.peptide.chars().filter(|c| c.is_ascii_alphabetic()).count()
    }

    /// Peptide sequence with modification masses inlined after their residue,
    /// e.g. `PEPT[+79.966331]IDE`. Terminal modifications are written before
    /// the first or after the last residue.
    pub fn annotated_peptide(&self) -> String {
        if self.modifications.is_empty() {
            return self.peptide.clone();
        }

        let len = self.peptide.chars().count();
        let mut out = String::with_capacity(self.peptide.len() + 12 * self.modifications.len());
        let push_mods = |out: &mut String, location: usize| {
            for m in self.modifications.iter().filter(|m| m.location == location) {
                out.push_str(&format!("[{:+}]", m.mass_delta));
            }
        };

        push_mods(&mut out, 0);
        for (i, residue) in self.peptide.chars().enumerate() {
            out.push(residue);
            push_mods(&mut out, i + 1);
        }
        push_mods(&mut out, len + 1);
        out
    }
}

/// All hits reported for one spectrum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectrumIdentificationResult {
    /// Native ID of the identified spectrum
    pub spectrum_id: String,

    /// Scan number when the search engine reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_number: Option<usize>,

    /// Scan start time in seconds when the search engine reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_time: Option<f64>,

    /// Candidate hits
    #[serde(default)]
    pub hits: Vec<IdentificationHit>,
}

/// Access to parsed identification results
pub trait IdentificationSource {
    /// Path of the identification file, recorded in provenance
    fn source_path(&self) -> &str;

    /// CV accession of the first analysis software that reported one
    fn analysis_software(&self) -> Option<&str>;

    /// Per-spectrum results, in file order
    fn results(&self) -> &[SpectrumIdentificationResult];
}

/// An identification file loaded into memory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentificationSet {
    /// Where the identifications were read from
    #[serde(default)]
    pub source_path: String,

    /// Analysis software accessions, in file order
    #[serde(default)]
    pub analysis_software: Vec<String>,

    /// Per-spectrum results
    #[serde(default)]
    pub results: Vec<SpectrumIdentificationResult>,
}

impl IdentificationSet {
    /// Load a set from a JSON file. The file path becomes the source path
    /// unless the file names one itself.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut set: Self = serde_json::from_reader(reader)?;
        if set.source_path.is_empty() {
            set.source_path = path.display().to_string();
        }
        Ok(set)
    }
}

impl IdentificationSource for IdentificationSet {
    fn source_path(&self) -> &str {
        &self.source_path
    }

    fn analysis_software(&self) -> Option<&str> {
        self.analysis_software.first().map(String::as_str)
    }

    fn results(&self) -> &[SpectrumIdentificationResult] {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotated_peptide() {
        let hit = IdentificationHit {
            peptide: "PEPTIDE".to_string(),
            modifications: vec![
                Modification {
                    location: 4,
                    mass_delta: 79.966331,
                },
                Modification {
                    location: 0,
                    mass_delta: 42.010565,
                },
            ],
            ..Default::default()
        };
        assert_eq!(hit.annotated_peptide(), "[+42.010565]PEPT[+79.966331]IDE");
        assert_eq!(hit.peptide_length(), 7);
    }

    #[test]
    fn test_unmodified_peptide_is_unchanged() {
        let hit = IdentificationHit {
            peptide: "ELVISLIVES".to_string(),
            ..Default::default()
        };
        assert_eq!(hit.annotated_peptide(), "ELVISLIVES");
    }

    #[test]
    fn test_first_software_wins() {
        let set = IdentificationSet {
            source_path: "run.mzid".to_string(),
            analysis_software: vec!["MS:1002048".to_string(), "MS:1002251".to_string()],
            results: Vec::new(),
        };
        assert_eq!(set.analysis_software(), Some("MS:1002048"));
        assert_eq!(set.source_path(), "run.mzid");
    }
}
