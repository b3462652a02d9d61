use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod refine;

pub use refine::RefineArgs;

/// mzrefine - m/z recalibration from peptide identifications
#[derive(Parser)]
#[command(name = "mzrefine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recalibrate a spectrum collection using identified peptides
    Refine {
        /// Spectrum collection (JSON)
        #[arg(long, value_name = "FILE")]
        spectra: PathBuf,

        /// Identification results (JSON)
        #[arg(long, value_name = "FILE")]
        identifications: PathBuf,

        /// Output spectrum collection (JSON)
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Score to filter identifications on (short name, CV name or accession)
        #[arg(short = 's', long)]
        score: Option<String>,

        /// Score range expression, e.g. "-1e-10", "5-" or "[1,5]"
        #[arg(short = 'r', long, conflicts_with_all = ["min", "max"], allow_hyphen_values = true)]
        range: Option<String>,

        /// Lower score bound
        #[arg(long, allow_hyphen_values = true)]
        min: Option<f64>,

        /// Upper score bound
        #[arg(long, allow_hyphen_values = true)]
        max: Option<f64>,

        /// Threshold relaxation multiplier (0 disables relaxation)
        #[arg(long)]
        step: Option<f64>,

        /// Maximum number of relaxation steps
        #[arg(long)]
        max_steps: Option<u32>,

        /// MS levels to recalibrate, comma separated
        #[arg(long, value_delimiter = ',')]
        ms_levels: Option<Vec<u8>>,

        /// Treat every spectrum as high resolution
        #[arg(long)]
        assume_high_res: bool,

        /// Precomputed fragment m/z table (JSON) for MS2 calibration
        #[arg(long, value_name = "FILE")]
        fragments: Option<PathBuf>,

        /// Append a statistics row to this TSV file
        #[arg(long, value_name = "FILE")]
        stats: Option<PathBuf>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Refine {
            spectra,
            identifications,
            output,
            score,
            range,
            min,
            max,
            step,
            max_steps,
            ms_levels,
            assume_high_res,
            fragments,
            stats,
            config,
        } => refine::run(RefineArgs {
            spectra,
            identifications,
            output,
            score,
            range,
            min,
            max,
            step,
            max_steps,
            ms_levels,
            assume_high_res,
            fragments,
            stats,
            config,
        }),
    }
}
