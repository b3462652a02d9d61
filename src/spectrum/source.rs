//! Spectrum collection abstraction
//!
//! The refiner never decodes instrument files itself. It reads spectra through
//! [`SpectrumSource`], which any reader can implement. [`InMemorySpectrumList`]
//! is the bundled implementation, loadable from JSON.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::models::Spectrum;
use crate::metadata::{InstrumentConfiguration, ProcessingHistory};

/// Errors raised by spectrum sources
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Requested index is past the end of the collection
    #[error("Spectrum index {index} out of range (collection holds {len} spectra)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Collection size
        len: usize,
    },

    /// I/O error reading a source file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A spectrum collection addressable by index and native ID
///
/// Implementations must be safe to share between threads: after construction
/// the refiner serves concurrent reads without locking.
pub trait SpectrumSource: Sync {
    /// Number of spectra in the collection
    fn len(&self) -> usize;

    /// Whether the collection is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a spectrum. Binary arrays are only populated when `with_binary` is set.
    fn spectrum(&self, index: usize, with_binary: bool) -> Result<Spectrum, SourceError>;

    /// Find the index of the spectrum with this native ID
    fn index_of(&self, native_id: &str) -> Option<usize>;

    /// Instrument configurations referenced by scans
    fn instrument_configurations(&self) -> &[InstrumentConfiguration];

    /// Processing applied to the collection so far
    fn processing_history(&self) -> &ProcessingHistory;
}

/// A fully materialised spectrum collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySpectrumList {
    /// Instrument configurations
    #[serde(default)]
    pub instrument_configurations: Vec<InstrumentConfiguration>,

    /// Processing history
    #[serde(default)]
    pub processing_history: ProcessingHistory,

    /// Spectra, in acquisition order
    pub spectra: Vec<Spectrum>,

    #[serde(skip)]
    id_index: HashMap<String, usize>,
}

impl InMemorySpectrumList {
    /// Build a collection from its parts, re-numbering spectrum indices
    pub fn new(
        instrument_configurations: Vec<InstrumentConfiguration>,
        processing_history: ProcessingHistory,
        spectra: Vec<Spectrum>,
    ) -> Self {
        let mut list = Self {
            instrument_configurations,
            processing_history,
            spectra,
            id_index: HashMap::new(),
        };
        list.reindex();
        list
    }

    /// Load a collection from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let reader = BufReader::new(File::open(path)?);
        let list: Self = serde_json::from_reader(reader)?;
        Ok(Self::new(
            list.instrument_configurations,
            list.processing_history,
            list.spectra,
        ))
    }

    /// Parse a collection from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let list: Self = serde_json::from_str(json)?;
        Ok(Self::new(
            list.instrument_configurations,
            list.processing_history,
            list.spectra,
        ))
    }

    /// Write the collection as pretty-printed JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SourceError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    fn reindex(&mut self) {
        self.id_index.clear();
        for (i, spectrum) in self.spectra.iter_mut().enumerate() {
            spectrum.index = i;
            self.id_index.insert(spectrum.id.clone(), i);
        }
    }
}

impl SpectrumSource for InMemorySpectrumList {
    fn len(&self) -> usize {
        self.spectra.len()
    }

    fn spectrum(&self, index: usize, with_binary: bool) -> Result<Spectrum, SourceError> {
        let spectrum = self.spectra.get(index).ok_or(SourceError::IndexOutOfRange {
            index,
            len: self.spectra.len(),
        })?;
        if with_binary {
            return Ok(spectrum.clone());
        }
        let mut meta = spectrum.clone();
        meta.strip_binary();
        Ok(meta)
    }

    fn index_of(&self, native_id: &str) -> Option<usize> {
        self.id_index.get(native_id).copied()
    }

    fn instrument_configurations(&self) -> &[InstrumentConfiguration] {
        &self.instrument_configurations
    }

    fn processing_history(&self) -> &ProcessingHistory {
        &self.processing_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(id: &str) -> Spectrum {
        Spectrum {
            id: id.to_string(),
            mz_array: vec![100.0, 200.0],
            intensity_array: vec![10.0, 20.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_index_and_lookup() {
        let list = InMemorySpectrumList::new(
            Vec::new(),
            ProcessingHistory::new(),
            vec![spectrum("scan=1"), spectrum("scan=2")],
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list.index_of("scan=2"), Some(1));
        assert_eq!(list.index_of("scan=3"), None);
        assert_eq!(list.spectrum(1, true).unwrap().index, 1);
    }

    #[test]
    fn test_metadata_only_fetch() {
        let list = InMemorySpectrumList::new(Vec::new(), ProcessingHistory::new(), vec![spectrum("a")]);
        let meta = list.spectrum(0, false).unwrap();
        assert!(meta.mz_array.is_empty());
        assert!(meta.intensity_array.is_empty());
        assert_eq!(list.spectrum(0, true).unwrap().peak_count(), 2);
    }

    #[test]
    fn test_out_of_range() {
        let list = InMemorySpectrumList::default();
        assert!(matches!(
            list.spectrum(3, false),
            Err(SourceError::IndexOutOfRange { index: 3, len: 0 })
        ));
    }

    #[test]
    fn test_json_rebuilds_index() {
        let json = r#"{"spectra": [{"index": 9, "id": "scan=5"}]}"#;
        let list = InMemorySpectrumList::from_json(json).unwrap();
        assert_eq!(list.index_of("scan=5"), Some(0));
        assert_eq!(list.spectra[0].index, 0);
    }
}
