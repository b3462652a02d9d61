//! # mzrefine
//!
//! A command-line tool for recalibrating the m/z values of a spectrum
//! collection from peptide identifications.
//!
//! ## Usage
//!
//! ```bash
//! # Recalibrate with MS-GF+ spectral E-values up to 1e-10
//! mzrefine refine --spectra run.json --identifications run.idents.json \
//!     --score SpecEValue --range=-1e-10 run.refined.json
//!
//! # Relax the threshold tenfold up to two times, and keep statistics
//! mzrefine -v refine --spectra run.json --identifications run.idents.json \
//!     --score SpecEValue --max 1e-10 --step 10 --max-steps 2 \
//!     --stats mzrefine_stats.tsv run.refined.json
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity
    cli::init_logging(cli.verbosity());

    cli::dispatch(cli)
}
