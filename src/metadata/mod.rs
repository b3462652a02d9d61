//! # Run-level metadata
//!
//! Instrument configurations (which decide whether a scan was recorded by a
//! high-resolution analyzer) and the data processing history that the refiner
//! extends with its provenance record.

mod error;
mod instrument;
mod processing;

pub use error::MetadataError;
pub use instrument::{ComponentType, InstrumentComponent, InstrumentConfiguration};
pub use processing::{ProcessingHistory, ProcessingStep};
