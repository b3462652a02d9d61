//! Model fitting and selection per sample pool

use log::{info, warn};

use super::error::RefinerError;
use super::ingest::{MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT, MINIMUM_RESULTS_FOR_GLOBAL_SHIFT};
use super::model::{BinnedModel, CalibrationModel, Dependency, GlobalModel, GlobalSeeds};
use super::progress::ProgressReporter;
use super::sample::ErrorSample;

/// A binned model must beat the global MAD by more than this, in percent
pub const IMPROVEMENT_THRESHOLD: f64 = 3.0;

const LABEL_WIDTH: usize = 50;

/// Fit the global model and, with enough samples, both binned models;
/// return the best.
///
/// With `require_peak`, a global histogram without a clear peak fails with
/// [`RefinerError::NoSignificantPeak`]. Scan time is preferred when it
/// improves at least as much as m/z.
pub fn select_model(
    samples: &[ErrorSample],
    require_peak: bool,
    progress: &mut ProgressReporter<'_>,
) -> Result<CalibrationModel, RefinerError> {
    let global = GlobalModel::fit(samples).ok_or(RefinerError::InsufficientData {
        found: 0,
        required: MINIMUM_RESULTS_FOR_GLOBAL_SHIFT,
    })?;

    info!("{:<LABEL_WIDTH$}{}", "Good data points:", samples.len());
    info!("{:<LABEL_WIDTH$}{}", "Systematic drift (mean):", global.mean_error());
    info!("{:<LABEL_WIDTH$}{}", "Systematic drift (mode):", global.mode_error());
    info!("{:<LABEL_WIDTH$}{}", "Systematic drift (median):", global.median_error());
    info!("{:<LABEL_WIDTH$}{}", "Measurement precision (MAD ppm):", global.mad());

    if require_peak && !global.check_for_peak() {
        warn!("Chose no shift: poor histogram peak");
        return Err(RefinerError::NoSignificantPeak {
            median_ppm: global.median_error(),
        });
    }

    let mut chosen = None;
    if samples.len() >= MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT {
        let seeds = GlobalSeeds::from(&global);
        let by_time = BinnedModel::fit(Dependency::ScanTime, samples, seeds, progress)?;
        let by_mz = BinnedModel::fit(Dependency::MassToCharge, samples, seeds, progress)?;
        log_binned(&by_time);
        log_binned(&by_mz);

        chosen = match preferred_dependency(by_time.percent_improvement(), by_mz.percent_improvement()) {
            Some(Dependency::ScanTime) => Some(CalibrationModel::ByScanTime(by_time)),
            Some(Dependency::MassToCharge) => Some(CalibrationModel::ByMassToCharge(by_mz)),
            None => None,
        };
    }
    let model = chosen.unwrap_or(CalibrationModel::Global(global));

    log_choice(&model);
    Ok(model)
}

/// Binned dependency worth using over the global shift, if any.
///
/// Both gains are percent MAD improvements over the global model. Equal
/// gains go to scan time.
pub fn preferred_dependency(time_gain: f64, mz_gain: f64) -> Option<Dependency> {
    if time_gain > IMPROVEMENT_THRESHOLD && time_gain >= mz_gain {
        Some(Dependency::ScanTime)
    } else if mz_gain > IMPROVEMENT_THRESHOLD {
        Some(Dependency::MassToCharge)
    } else {
        None
    }
}

/// Model for fragment m/z values; falls back to the precursor model when too
/// few fragment matches were collected.
pub fn select_fragment_model(
    samples: &[ErrorSample],
    precursor_model: &CalibrationModel,
    progress: &mut ProgressReporter<'_>,
) -> Result<CalibrationModel, RefinerError> {
    if samples.len() < MINIMUM_RESULTS_FOR_GLOBAL_SHIFT {
        info!(
            "Only {} fragment matches; fragment spectra use the precursor model",
            samples.len()
        );
        return Ok(precursor_model.clone());
    }
    select_model(samples, false, progress)
}

fn log_binned(model: &BinnedModel) {
    let rough = model.rough_stats();
    let smoothed = model.smoothed_stats();
    let dependency = model.dependency();
    info!("{:<LABEL_WIDTH$}{}", format!("Average bin-wise MAD ({}):", dependency), rough.mad);
    info!(
        "{:<LABEL_WIDTH$}{}",
        format!("Average bin-wise MAD (smoothed {}):", dependency),
        smoothed.mad
    );
    info!(
        "{:<LABEL_WIDTH$}{}",
        format!("Expected % improvement (MAD {}):", dependency),
        rough.mad_improvement
    );
    info!(
        "{:<LABEL_WIDTH$}{}",
        format!("Expected % improvement (MAD smoothed {}):", dependency),
        smoothed.mad_improvement
    );
}

fn log_choice(model: &CalibrationModel) {
    let kind = model.kind();
    info!("Chose {}", kind.description());
    info!(
        "{:<LABEL_WIDTH$}{}",
        format!("Applied {}:", kind.shift_label()),
        model.shift_range()
    );
    info!("{:<LABEL_WIDTH$}{}", "Estimated final stdev:", model.stdev());
    info!(
        "{:<LABEL_WIDTH$}0 +/- {}",
        "Estimated tolerance for 99% (ppm):",
        model.stdev_tolerance()
    );
    info!("{:<LABEL_WIDTH$}{}", "Estimated final MAD:", model.mad());
    info!(
        "{:<LABEL_WIDTH$}0 +/- {}",
        "Estimated MAD tolerance for 99% (ppm):",
        model.mad_tolerance()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refiner::model::ModelKind;

    fn sample(mz: f64, ppm: f64, scan_time: f64) -> ErrorSample {
        ErrorSample::new(mz, mz * (1.0 + ppm / 1.0e6), scan_time)
    }

    fn jitter(i: usize) -> f64 {
        if i % 2 == 0 {
            0.4
        } else {
            -0.4
        }
    }

    fn time_drift() -> Vec<ErrorSample> {
        (0..1500)
            .map(|i| {
                let t = i as f64;
                let mz = 500.0 + ((i * 37) % 1000) as f64;
                sample(mz, t / 150.0 + jitter(i), t)
            })
            .collect()
    }

    fn mz_drift() -> Vec<ErrorSample> {
        (0..1500)
            .map(|i| {
                let mz = 400.0 + i as f64 * (1000.0 / 1500.0);
                let t = ((i * 37) % 1500) as f64;
                sample(mz, (mz - 400.0) / 100.0 + jitter(i), t)
            })
            .collect()
    }

    #[test]
    fn test_scan_time_drift_selects_scan_time_model() {
        let model = select_model(&time_drift(), true, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(model.kind(), ModelKind::ScanTime);
        assert!(model.percent_improvement() > IMPROVEMENT_THRESHOLD);
    }

    #[test]
    fn test_mz_drift_selects_mz_model() {
        let model = select_model(&mz_drift(), true, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(model.kind(), ModelKind::MassToCharge);
    }

    #[test]
    fn test_small_pool_uses_global() {
        let samples: Vec<ErrorSample> = time_drift().into_iter().take(300).collect();
        let model = select_model(&samples, true, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(model.kind(), ModelKind::Global);
    }

    #[test]
    fn test_dependent_shift_floor() {
        let steep = |n: usize| -> Vec<ErrorSample> {
            (0..n)
                .map(|i| {
                    let t = i as f64;
                    let mz = 500.0 + ((i * 37) % 1000) as f64;
                    sample(mz, t / 50.0 + jitter(i), t)
                })
                .collect()
        };

        let below = steep(MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT - 1);
        let model = select_model(&below, false, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(model.kind(), ModelKind::Global);

        let at = steep(MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT);
        let model = select_model(&at, false, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(model.kind(), ModelKind::ScanTime);
    }

    #[test]
    fn test_preferred_dependency_rules() {
        assert_eq!(preferred_dependency(10.0, 10.0), Some(Dependency::ScanTime));
        assert_eq!(preferred_dependency(10.0, 12.0), Some(Dependency::MassToCharge));
        assert_eq!(preferred_dependency(2.0, 5.0), Some(Dependency::MassToCharge));
        assert_eq!(preferred_dependency(IMPROVEMENT_THRESHOLD, 1.0), None);
        assert_eq!(preferred_dependency(1.0, IMPROVEMENT_THRESHOLD), None);
        assert_eq!(preferred_dependency(-20.0, -5.0), None);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let samples = time_drift();
        let first = select_model(&samples, true, &mut ProgressReporter::silent()).unwrap();
        let second = select_model(&samples, true, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.shift(321.0, 654.0), second.shift(321.0, 654.0));
    }

    #[test]
    fn test_missing_peak_is_fatal_only_when_required() {
        let mut samples: Vec<ErrorSample> =
            (0..60).map(|i| sample(800.0, -10.0 + i as f64 * (20.0 / 60.0), i as f64)).collect();
        samples.extend((0..40).map(|i| sample(800.0, 30.0, i as f64)));

        let err = select_model(&samples, true, &mut ProgressReporter::silent()).unwrap_err();
        assert!(matches!(err, RefinerError::NoSignificantPeak { .. }));
        assert!(select_model(&samples, false, &mut ProgressReporter::silent()).is_ok());
    }

    #[test]
    fn test_fragment_model_falls_back() {
        let precursor = select_model(&time_drift(), true, &mut ProgressReporter::silent()).unwrap();
        let few: Vec<ErrorSample> = (0..50).map(|i| sample(300.0, 8.0, i as f64)).collect();
        let fragment = select_fragment_model(&few, &precursor, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(fragment, precursor);

        let many: Vec<ErrorSample> = (0..150).map(|i| sample(300.0, 8.0, i as f64)).collect();
        let fragment = select_fragment_model(&many, &precursor, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(fragment.kind(), ModelKind::Global);
        assert!((fragment.global_shift() - 8.0).abs() < 1e-6);
    }
}
