//! Calibration models
//!
//! A [`CalibrationModel`] maps an observed m/z (and the scan time it was
//! observed at) to a corrected m/z. Three shapes exist: a single global ppm
//! shift, and binned shifts that depend on scan time or on m/z.

mod binned;
mod global;

use std::fmt;

pub use binned::{
    Bin, BinStats, BinnedModel, Dependency, GlobalSeeds, MZ_BIN_WIDTH, SCAN_TIME_BIN_WIDTH,
    SMOOTHING_MIN_COUNT,
};
pub use global::{GlobalModel, HISTOGRAM_BINS, HISTOGRAM_BIN_PPM};

/// Which calibration shape was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Single ppm shift
    Global,
    /// Scan time dependent shift
    ScanTime,
    /// m/z dependent shift
    MassToCharge,
}

impl ModelKind {
    /// Human-readable description, as logged
    pub fn description(&self) -> &'static str {
        match self {
            ModelKind::Global => "Global Shift",
            ModelKind::ScanTime => "Using scan time dependency",
            ModelKind::MassToCharge => "Using mass to charge dependency",
        }
    }

    /// Dependency label recorded in processing metadata
    pub fn shift_label(&self) -> &'static str {
        match self {
            ModelKind::Global => "Global PPM Shift",
            ModelKind::ScanTime => "scan time dependent shift",
            ModelKind::MassToCharge => "m/z dependent shift",
        }
    }

    /// Short method name for the statistics file
    pub fn method_name(&self) -> &'static str {
        match self {
            ModelKind::Global => "SimpleGlobal",
            ModelKind::ScanTime => "ByScanTime",
            ModelKind::MassToCharge => "ByMassToCharge",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A fitted calibration model
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationModel {
    /// Single ppm shift
    Global(GlobalModel),
    /// Shift as a function of scan time
    ByScanTime(BinnedModel),
    /// Shift as a function of m/z
    ByMassToCharge(BinnedModel),
}

impl CalibrationModel {
    /// Corrected m/z of `mass` observed at `scan_time` seconds
    pub fn shift(&self, scan_time: f64, mass: f64) -> f64 {
        match self {
            CalibrationModel::Global(model) => model.shift(mass),
            CalibrationModel::ByScanTime(model) => model.shift(scan_time, mass),
            CalibrationModel::ByMassToCharge(model) => model.shift(mass, mass),
        }
    }

    /// Which shape this is
    pub fn kind(&self) -> ModelKind {
        match self {
            CalibrationModel::Global(_) => ModelKind::Global,
            CalibrationModel::ByScanTime(_) => ModelKind::ScanTime,
            CalibrationModel::ByMassToCharge(_) => ModelKind::MassToCharge,
        }
    }

    /// Residual standard deviation after calibration, in ppm
    pub fn stdev(&self) -> f64 {
        match self {
            CalibrationModel::Global(model) => model.stdev(),
            CalibrationModel::ByScanTime(model) | CalibrationModel::ByMassToCharge(model) => model.stdev(),
        }
    }

    /// Residual median absolute deviation after calibration, in ppm
    pub fn mad(&self) -> f64 {
        match self {
            CalibrationModel::Global(model) => model.mad(),
            CalibrationModel::ByScanTime(model) | CalibrationModel::ByMassToCharge(model) => model.mad(),
        }
    }

    /// MAD improvement over the global shift, in percent (0 for the global model)
    pub fn percent_improvement(&self) -> f64 {
        match self {
            CalibrationModel::Global(_) => 0.0,
            CalibrationModel::ByScanTime(model) | CalibrationModel::ByMassToCharge(model) => {
                model.percent_improvement()
            }
        }
    }

    /// The global ppm shift underlying this model
    pub fn global_shift(&self) -> f64 {
        match self {
            CalibrationModel::Global(model) => model.shift_ppm(),
            CalibrationModel::ByScanTime(model) | CalibrationModel::ByMassToCharge(model) => {
                model.seeds().shift
            }
        }
    }

    /// The applied shift, or `"min to max"` for binned models
    pub fn shift_range(&self) -> String {
        match self {
            CalibrationModel::Global(model) => model.shift_ppm().to_string(),
            CalibrationModel::ByScanTime(model) | CalibrationModel::ByMassToCharge(model) => {
                model.shift_range()
            }
        }
    }

    /// Three standard deviations, the suggested search tolerance in ppm
    pub fn stdev_tolerance(&self) -> f64 {
        3.0 * self.stdev()
    }

    /// MAD scaled to a normal-equivalent three sigma tolerance, in ppm
    pub fn mad_tolerance(&self) -> f64 {
        self.mad() * 3.0 * 1.4826
    }
}
