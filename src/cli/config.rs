//! TOML configuration file support for power users.
//!
//! Instead of passing many CLI flags, users can specify settings in a config file:
//!
//! ```toml
//! # mzrefine.toml
//! [refine]
//! score = "SpecEValue"
//! range = "-1e-10"
//! step = 10.0
//! max_steps = 2
//! ms_levels = [1, 2]
//! assume_high_res = false
//! stats = "mzrefine_stats.tsv"
//! ```
//!
//! Flags given on the command line win over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure for mzrefine.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Refinement settings.
    #[serde(default)]
    pub refine: RefineConfig,
}

/// Configuration for the refine command.
#[derive(Debug, Default, Deserialize)]
pub struct RefineConfig {
    /// Score name to filter on.
    pub score: Option<String>,

    /// Score range expression.
    pub range: Option<String>,

    /// Explicit lower score bound.
    pub min: Option<f64>,

    /// Explicit upper score bound.
    pub max: Option<f64>,

    /// Threshold relaxation multiplier.
    pub step: Option<f64>,

    /// Maximum relaxation steps.
    pub max_steps: Option<u32>,

    /// MS levels to recalibrate.
    pub ms_levels: Option<Vec<u8>>,

    /// Treat all spectra as high resolution.
    pub assume_high_res: Option<bool>,

    /// Precomputed fragment table.
    pub fragments: Option<PathBuf>,

    /// Statistics file to append to.
    pub stats: Option<PathBuf>,

    /// Isotope screening threshold in Da.
    pub isotope_screen_da: Option<f64>,

    /// Progress log interval.
    pub progress_interval: Option<usize>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
