//! Theoretical fragment ion masses
//!
//! The refiner does not compute peptide masses. It asks a
//! [`FragmentMassCalculator`] for the m/z of each fragment it wants to look
//! for, which keeps mass tables and modification handling outside the engine.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::spectrum::SourceError;

/// Fragment ion series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IonType {
    /// N-terminal b ion
    B,
    /// N-terminal c ion
    C,
    /// C-terminal y ion
    Y,
    /// C-terminal z ion
    Z,
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IonType::B => "b",
            IonType::C => "c",
            IonType::Y => "y",
            IonType::Z => "z",
        };
        f.write_str(s)
    }
}

/// Computes theoretical fragment m/z values
pub trait FragmentMassCalculator: Sync {
    /// m/z of the fragment of `ion` type at `position` and `charge`, for a
    /// peptide with inline modification masses.
    ///
    /// `position` is a 0-based ion index: 0 is the one-residue ion of the
    /// series (b1, y1), and `length - 1` covers the whole peptide.
    ///
    /// Returns `None` when the fragment does not exist.
    fn fragment_mz(&self, peptide: &str, ion: IonType, position: usize, charge: u8) -> Option<f64>;
}

/// A single precomputed fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentIon {
    /// Ion series
    pub ion: IonType,
    /// 0-based ion index (0 for b1, y1)
    pub position: usize,
    /// Charge state
    pub charge: u8,
    /// Theoretical m/z
    pub mz: f64,
}

/// Fragment masses produced by an external tool, keyed by annotated peptide
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecomputedFragments {
    peptides: HashMap<String, Vec<FragmentIon>>,
}

impl PrecomputedFragments {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the fragments of a peptide
    pub fn insert(&mut self, peptide: impl Into<String>, fragments: Vec<FragmentIon>) {
        self.peptides.insert(peptide.into(), fragments);
    }

    /// Number of peptides in the table
    pub fn len(&self) -> usize {
        self.peptides.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.peptides.is_empty()
    }

    /// Load a table from a JSON object mapping peptides to fragment lists
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl FragmentMassCalculator for PrecomputedFragments {
    fn fragment_mz(&self, peptide: &str, ion: IonType, position: usize, charge: u8) -> Option<f64> {
        self.peptides
            .get(peptide)?
            .iter()
            .find(|f| f.ion == ion && f.position == position && f.charge == charge)
            .map(|f| f.mz)
    }
}
