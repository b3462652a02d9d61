use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use mzrefine::identification::{FragmentMassCalculator, IdentificationSet, PrecomputedFragments};
use mzrefine::refiner::{MzRefiner, ProgressReporter, RefinerConfig, ThresholdSpec};
use mzrefine::spectrum::{InMemorySpectrumList, SourceError, Spectrum, SpectrumSource};

use super::config::Config;

/// Command-line options of the refine command, before config file merging
#[derive(Debug, Default)]
pub struct RefineArgs {
    pub spectra: PathBuf,
    pub identifications: PathBuf,
    pub output: PathBuf,
    pub score: Option<String>,
    pub range: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub max_steps: Option<u32>,
    pub ms_levels: Option<Vec<u8>>,
    pub assume_high_res: bool,
    pub fragments: Option<PathBuf>,
    pub stats: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Recalibrate a spectrum collection and write it back out
pub fn run(args: RefineArgs) -> Result<()> {
    if !args.spectra.exists() {
        anyhow::bail!("Spectrum file does not exist: {}", args.spectra.display());
    }
    if !args.identifications.exists() {
        anyhow::bail!(
            "Identification file does not exist: {}",
            args.identifications.display()
        );
    }

    let file_config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let (config, fragments_path) = merge(&args, file_config);

    info!("mzrefine - m/z recalibration");
    info!("============================");
    info!("Spectra:         {}", args.spectra.display());
    info!("Identifications: {}", args.identifications.display());
    info!("Output:          {}", args.output.display());
    info!("Score:           {}", config.score_name);
    info!("MS levels:       {:?}", config.ms_levels);

    let spectra = InMemorySpectrumList::from_json_file(&args.spectra)
        .with_context(|| format!("Failed to read spectra from {}", args.spectra.display()))?;
    let idents = IdentificationSet::from_json_file(&args.identifications).with_context(|| {
        format!(
            "Failed to read identifications from {}",
            args.identifications.display()
        )
    })?;
    let fragments = match &fragments_path {
        Some(path) => Some(
            PrecomputedFragments::from_json_file(path)
                .with_context(|| format!("Failed to read fragment table {}", path.display()))?,
        ),
        None => None,
    };

    let mut progress = ProgressReporter::silent().with_log_interval(config.progress_interval);
    let refiner = MzRefiner::with_options(
        spectra,
        &idents,
        &config,
        fragments.as_ref().map(|f| f as &dyn FragmentMassCalculator),
        &mut progress,
    )
    .context("Refinement failed")?;

    let adjusted = adjust_all(&refiner).context("Failed to read adjusted spectra")?;
    let output = InMemorySpectrumList::new(
        refiner.instrument_configurations().to_vec(),
        refiner.processing_history().clone(),
        adjusted,
    );
    output
        .to_json_file(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    print_summary(&refiner, &args.output);
    Ok(())
}

fn merge(args: &RefineArgs, file: Config) -> (RefinerConfig, Option<PathBuf>) {
    let file = file.refine;
    let mut config = RefinerConfig::default();

    if let Some(score) = args.score.clone().or(file.score) {
        config.score_name = score;
    }
    let min = args.min.or(file.min);
    let max = args.max.or(file.max);
    if let Some(range) = args.range.clone() {
        config.threshold = ThresholdSpec::Range { range };
    } else if min.is_some() || max.is_some() {
        config.threshold = ThresholdSpec::Bounds {
            min: min.unwrap_or(0.0),
            max: max.unwrap_or(0.0),
            use_min: min.is_some(),
            use_max: max.is_some(),
        };
    } else if let Some(range) = file.range {
        config.threshold = ThresholdSpec::Range { range };
    }
    if let Some(step) = args.step.or(file.step) {
        config.step = step;
    }
    if let Some(max_steps) = args.max_steps.or(file.max_steps) {
        config.max_steps = max_steps;
    }
    if let Some(levels) = args.ms_levels.clone().or(file.ms_levels) {
        config.ms_levels = levels;
    }
    config.assume_high_res = args.assume_high_res || file.assume_high_res.unwrap_or(false);
    if let Some(screen) = file.isotope_screen_da {
        config.isotope_screen_da = screen;
    }
    if let Some(interval) = file.progress_interval {
        config.progress_interval = interval;
    }
    config.stats_path = args.stats.clone().or(file.stats);

    (config, args.fragments.clone().or(file.fragments))
}

#[cfg(feature = "parallel")]
fn adjust_all<S: SpectrumSource>(refiner: &MzRefiner<S>) -> Result<Vec<Spectrum>, SourceError> {
    use rayon::prelude::*;
    (0..refiner.len())
        .into_par_iter()
        .map(|index| refiner.spectrum(index, true))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn adjust_all<S: SpectrumSource>(refiner: &MzRefiner<S>) -> Result<Vec<Spectrum>, SourceError> {
    (0..refiner.len())
        .map(|index| refiner.spectrum(index, true))
        .collect()
}

fn print_summary<S: SpectrumSource>(refiner: &MzRefiner<S>, output: &std::path::Path) {
    let summary = refiner.summary();
    let ms1 = refiner.ms1_model();
    let ms2 = refiner.ms2_model();

    #[cfg(feature = "colorized_output")]
    {
        use console::style;
        println!("{}", style("m/z Refinement Summary").bold().cyan());
        println!("{}", style("======================").cyan());
        println!("{}: {}", style("Output").bold(), output.display());
        println!(
            "{}: {} {}",
            style("Threshold").bold(),
            summary.threshold.score_name(),
            summary.threshold.description()
        );
        println!(
            "{}: {} by score, {} by mass error",
            style("Excluded").bold(),
            style(summary.counts.rejected_by_score).yellow(),
            style(summary.counts.rejected_by_mass_error).yellow()
        );
        println!(
            "{}: {} ({} samples, shift {})",
            style("MS1").bold(),
            style(ms1.kind()).green(),
            summary.ms1_samples,
            ms1.shift_range()
        );
        println!(
            "{}: {} ({} samples, shift {})",
            style("MS2").bold(),
            style(ms2.kind()).green(),
            summary.ms2_samples,
            ms2.shift_range()
        );
        if let Some(path) = &summary.stats_written_to {
            println!("{}: {}", style("Statistics").bold(), path.display());
        }
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("m/z Refinement Summary");
        println!("======================");
        println!("Output: {}", output.display());
        println!(
            "Threshold: {} {}",
            summary.threshold.score_name(),
            summary.threshold.description()
        );
        println!(
            "Excluded: {} by score, {} by mass error",
            summary.counts.rejected_by_score, summary.counts.rejected_by_mass_error
        );
        println!(
            "MS1: {} ({} samples, shift {})",
            ms1.kind(),
            summary.ms1_samples,
            ms1.shift_range()
        );
        println!(
            "MS2: {} ({} samples, shift {})",
            ms2.kind(),
            summary.ms2_samples,
            ms2.shift_range()
        );
        if let Some(path) = &summary.stats_written_to {
            println!("Statistics: {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let file = Config::from_str(
            r#"
            [refine]
            score = "xcorr"
            range = "2.5-"
            step = 0.9
            ms_levels = [1]
        "#,
        )
        .unwrap();
        let args = RefineArgs {
            score: Some("SpecEValue".to_string()),
            max_steps: Some(4),
            ..Default::default()
        };

        let (config, fragments) = merge(&args, file);
        assert_eq!(config.score_name, "SpecEValue");
        assert_eq!(
            config.threshold,
            ThresholdSpec::Range {
                range: "2.5-".to_string()
            }
        );
        assert_eq!(config.step, 0.9);
        assert_eq!(config.max_steps, 4);
        assert_eq!(config.ms_levels, vec![1]);
        assert!(fragments.is_none());
    }

    #[test]
    fn test_explicit_bounds() {
        let args = RefineArgs {
            max: Some(1e-10),
            ..Default::default()
        };
        let (config, _) = merge(&args, Config::default());
        assert_eq!(
            config.threshold,
            ThresholdSpec::Bounds {
                min: 0.0,
                max: 1e-10,
                use_min: false,
                use_max: true
            }
        );
        assert_eq!(config.ms_levels, vec![1, 2]);
    }
}
