//! # Spectra
//!
//! Spectrum metadata and peak arrays, plus the [`SpectrumSource`] abstraction
//! the refiner reads from.

mod models;
mod source;

pub use models::{scan_number_from_native_id, Precursor, Scan, Spectrum};
pub use source::{InMemorySpectrumList, SourceError, SpectrumSource};
