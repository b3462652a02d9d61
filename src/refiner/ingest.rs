//! Identification ingestion
//!
//! Turns search results into precursor error samples. Each pass filters hits
//! by score, repairs isotope miscalls, gates on mass and ppm error, and keeps
//! at most one sample per spectrum. Passes repeat with a relaxed threshold
//! until enough samples survive for binned models or the step budget runs out.

use std::cmp::Ordering;

use log::{info, warn};

use crate::identification::{IdentificationSource, SpectrumIdentificationResult};
use crate::spectrum::scan_number_from_native_id;

use super::error::RefinerError;
use super::filter::ScoreThreshold;
use super::isotope;
use super::progress::{ProgressReporter, Stage};
use super::sample::{ErrorSample, Identification};

/// Fewest samples a global shift is estimated from
pub const MINIMUM_RESULTS_FOR_GLOBAL_SHIFT: usize = 100;

/// Fewest samples binned (scan time or m/z dependent) shifts are estimated from
pub const MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT: usize = 500;

/// Numeric gates applied to every score-passing hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassErrorGates {
    /// Mass errors beyond this trigger isotope repair, in Da
    pub isotope_screen_da: f64,
    /// Mass errors must be strictly within this, in Da
    pub isotope_filter_da: f64,
    /// ppm errors must be within this
    pub ppm_error_limit: f64,
}

impl Default for MassErrorGates {
    fn default() -> Self {
        Self {
            isotope_screen_da: 0.15,
            isotope_filter_da: 0.20,
            ppm_error_limit: 50.0,
        }
    }
}

impl MassErrorGates {
    fn admits(&self, sample: &ErrorSample) -> bool {
        let mass_error = sample.mass_error();
        let ppm_error = sample.ppm_error();
        -self.isotope_filter_da < mass_error
            && mass_error < self.isotope_filter_da
            && -self.ppm_error_limit <= ppm_error
            && ppm_error <= self.ppm_error_limit
    }
}

/// Rejection counters of one ingestion pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounts {
    /// Hits whose score was missing or outside the threshold
    pub rejected_by_score: usize,
    /// Score-passing hits dropped by the mass or ppm error gates
    pub rejected_by_mass_error: usize,
    /// Gate-passing hits discarded because a better hit existed for the spectrum
    pub excess: usize,
    /// Hits whose experimental m/z was moved by isotope repair
    pub isotope_corrected: usize,
}

/// Outcome of ingestion
#[derive(Debug, Clone)]
pub struct Ingestion {
    /// One sample per identified spectrum
    pub samples: Vec<ErrorSample>,
    /// The threshold of the final pass
    pub threshold: ScoreThreshold,
    /// Counters of the final pass
    pub counts: IngestCounts,
}

/// Ingest identifications, relaxing the threshold as needed.
///
/// Fails with [`RefinerError::InsufficientData`] when fewer than
/// [`MINIMUM_RESULTS_FOR_GLOBAL_SHIFT`] samples survive the final pass.
pub fn ingest(
    source: &dyn IdentificationSource,
    threshold: ScoreThreshold,
    gates: &MassErrorGates,
    progress: &mut ProgressReporter<'_>,
) -> Result<Ingestion, RefinerError> {
    info!("Reading identifications from \"{}\"", source.source_path());

    let results = source.results();
    let mut threshold = threshold;
    let (samples, counts) = loop {
        let (samples, counts) = ingest_pass(results, &threshold, gates, progress)?;
        info!(
            "Pass with threshold {}: kept {}, rejected {} by score, {} by mass error, {} excess",
            threshold.description(),
            samples.len(),
            counts.rejected_by_score,
            counts.rejected_by_mass_error,
            counts.excess
        );
        if samples.len() >= MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT {
            break (samples, counts);
        }
        match threshold.relaxed() {
            Some(next) => threshold = next,
            None => break (samples, counts),
        }
    };

    if samples.len() < MINIMUM_RESULTS_FOR_GLOBAL_SHIFT {
        warn!(
            "Excluding \"{}\": only {} results after filtering",
            source.source_path(),
            samples.len()
        );
        return Err(RefinerError::InsufficientData {
            found: samples.len(),
            required: MINIMUM_RESULTS_FOR_GLOBAL_SHIFT,
        });
    }
    if samples.len() < MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT {
        warn!(
            "Low number of good identifications ({} < {}); dependent shifts will not be attempted",
            samples.len(),
            MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT
        );
    }
    info!(
        "Filtered out {} identifications because of score, {} because of mass error",
        counts.rejected_by_score, counts.rejected_by_mass_error
    );

    Ok(Ingestion {
        samples,
        threshold,
        counts,
    })
}

fn ingest_pass(
    results: &[SpectrumIdentificationResult],
    threshold: &ScoreThreshold,
    gates: &MassErrorGates,
    progress: &mut ProgressReporter<'_>,
) -> Result<(Vec<ErrorSample>, IngestCounts), RefinerError> {
    let mut samples = Vec::new();
    let mut counts = IngestCounts::default();
    let mut candidates: Vec<ErrorSample> = Vec::new();

    for (position, result) in results.iter().enumerate() {
        progress.report(Stage::Ingestion, position + 1, results.len())?;

        let scan_id = result
            .scan_number
            .or_else(|| scan_number_from_native_id(&result.spectrum_id))
            .unwrap_or(position + 1);
        let scan_time = result.scan_time.unwrap_or(0.0);
        candidates.clear();

        for hit in &result.hits {
            let score_value = match threshold.passes_filter(hit) {
                (true, Some(value)) => value,
                _ => {
                    counts.rejected_by_score += 1;
                    continue;
                }
            };

            let mut sample = ErrorSample::new(hit.calculated_mz, hit.experimental_mz, scan_time)
                .with_identification(Identification {
                    scan_id,
                    native_id: result.spectrum_id.clone(),
                    rank: hit.rank,
                    peptide: hit.annotated_peptide(),
                    peptide_length: hit.peptide_length(),
                    ms_level: None,
                    high_res: false,
                    score_value,
                    charge: hit.charge,
                });

            if sample.mass_error().abs() > gates.isotope_screen_da
                && isotope::try_correct(&mut sample, hit.charge)
            {
                counts.isotope_corrected += 1;
            }

            if !gates.admits(&sample) {
                counts.rejected_by_mass_error += 1;
            } else if result.hits.len() == 1 {
                samples.push(sample);
            } else {
                candidates.push(sample);
            }
        }

        if candidates.len() > 1 {
            candidates.sort_by(|a, b| compare_samples(threshold, a, b));
            counts.excess += candidates.len() - 1;
        }
        if let Some(best) = candidates.drain(..).next() {
            samples.push(best);
        }
    }

    Ok((samples, counts))
}

fn compare_samples(threshold: &ScoreThreshold, a: &ErrorSample, b: &ErrorSample) -> Ordering {
    match (a.identification(), b.identification()) {
        (Some(a), Some(b)) => threshold.compare_identifications(a, b),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlled_vocabulary::{CvParamList, CvTerm};
    use crate::identification::{IdentificationHit, IdentificationSet};
    use crate::refiner::filter::ScoreSelector;
    use crate::refiner::progress::Flow;

    fn hit(rank: u32, calc: f64, exper: f64, score: f64) -> IdentificationHit {
        IdentificationHit {
            rank,
            charge: 2,
            calculated_mz: calc,
            experimental_mz: exper,
            peptide: "PEPTIDEK".to_string(),
            cv_params: CvParamList::new()
                .with(CvTerm::new("MS:1002052", "MS-GF:SpecEValue").with_value(score)),
            ..Default::default()
        }
    }

    fn result(scan: usize, hits: Vec<IdentificationHit>) -> SpectrumIdentificationResult {
        SpectrumIdentificationResult {
            spectrum_id: format!("scan={}", scan),
            scan_number: None,
            scan_time: Some(scan as f64),
            hits,
        }
    }

    fn threshold(expr: &str, step: f64, max_steps: u32) -> ScoreThreshold {
        ScoreThreshold::from_expression(ScoreSelector::Name("SpecEValue".into()), expr, step, max_steps)
            .unwrap()
    }

    fn set(results: Vec<SpectrumIdentificationResult>) -> IdentificationSet {
        IdentificationSet {
            source_path: "test.mzid".to_string(),
            analysis_software: Vec::new(),
            results,
        }
    }

    #[test]
    fn test_single_pass_counts() {
        let results = vec![
            result(1, vec![hit(1, 500.0, 500.001, 1e-12)]),
            result(2, vec![hit(1, 500.0, 500.001, 1e-3)]),
            result(3, vec![hit(1, 500.0, 500.3, 1e-12)]),
            result(
                4,
                vec![hit(2, 600.0, 600.002, 1e-13), hit(1, 600.0, 600.001, 1e-12)],
            ),
        ];
        let (samples, counts) = ingest_pass(
            &results,
            &threshold("-1e-10", 0.0, 0),
            &MassErrorGates::default(),
            &mut ProgressReporter::silent(),
        )
        .unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(counts.rejected_by_score, 1);
        assert_eq!(counts.rejected_by_mass_error, 1);
        assert_eq!(counts.excess, 1);

        let best = samples[1].identification().unwrap();
        assert_eq!(best.rank, 1);
        assert_eq!(best.scan_id, 4);
    }

    #[test]
    fn test_isotope_repair_keeps_sample() {
        let results = vec![result(7, vec![hit(1, 700.0, 700.0 + 1.003355 / 2.0, 1e-12)])];
        let (samples, counts) = ingest_pass(
            &results,
            &threshold("-1e-10", 0.0, 0),
            &MassErrorGates::default(),
            &mut ProgressReporter::silent(),
        )
        .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(counts.isotope_corrected, 1);
        assert!(samples[0].mass_error().abs() < 0.01);
    }

    #[test]
    fn test_insufficient_after_relaxation() {
        let results = (1..=150)
            .map(|scan| result(scan, vec![hit(1, 500.0, 500.001, 5e-9)]))
            .collect();
        let source = set(results);

        let err = ingest(
            &source,
            threshold("-1e-10", 10.0, 1),
            &MassErrorGates::default(),
            &mut ProgressReporter::silent(),
        )
        .unwrap_err();
        assert!(matches!(err, RefinerError::InsufficientData { found: 0, required: 100 }));

        let ingestion = ingest(
            &source,
            threshold("-1e-10", 10.0, 2),
            &MassErrorGates::default(),
            &mut ProgressReporter::silent(),
        )
        .unwrap();
        assert_eq!(ingestion.samples.len(), 150);
        assert_eq!(ingestion.threshold.step_count(), 2);
    }

    #[test]
    fn test_cancellation_stops_ingestion() {
        let source = set(vec![result(1, vec![hit(1, 500.0, 500.001, 1e-12)])]);
        let mut progress = ProgressReporter::new(|_| Flow::Cancel);
        let err = ingest(&source, threshold("-1e-10", 0.0, 0), &MassErrorGates::default(), &mut progress)
            .unwrap_err();
        assert!(matches!(err, RefinerError::Cancelled { .. }));
    }
}
