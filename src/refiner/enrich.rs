//! Spectrum metadata enrichment
//!
//! Identification files rarely carry everything the models need. One pass
//! over the spectrum collection fills in scan time, MS level and resolution
//! for each precursor sample, and collects fragment samples from high
//! resolution MS2 spectra along the way.

use log::{debug, info};

use crate::identification::FragmentMassCalculator;
use crate::spectrum::SpectrumSource;

use super::adjuster::spectrum_is_high_res;
use super::error::RefinerError;
use super::fragments::match_fragments;
use super::progress::{ProgressReporter, Stage};
use super::sample::ErrorSample;

/// Options for [`enrich`]
#[derive(Clone, Copy)]
pub struct EnrichOptions<'a> {
    /// Treat every spectrum as high resolution
    pub assume_high_res: bool,
    /// Collect fragment samples from MS2 spectra
    pub match_fragments: bool,
    /// Source of theoretical fragment m/z values
    pub fragments: Option<&'a dyn FragmentMassCalculator>,
}

/// Outcome of enrichment
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    /// Samples matched to a spectrum
    pub matched: usize,
    /// Fragment samples from MS2 spectra
    pub fragment_samples: Vec<ErrorSample>,
}

/// Fill in spectrum-derived fields of `samples`.
///
/// Each sample is resolved to a spectrum through its native ID, then the
/// collection is walked once in index order. Samples whose native ID is not
/// in the collection are left untouched.
pub fn enrich<S: SpectrumSource + ?Sized>(
    samples: &mut [ErrorSample],
    source: &S,
    options: EnrichOptions<'_>,
    progress: &mut ProgressReporter<'_>,
) -> Result<Enrichment, RefinerError> {
    info!("Reading scan metadata for {} identifications", samples.len());
    samples.sort_by_key(|s| s.scan_id().unwrap_or(0));

    // (spectrum index, sample position), walked in spectrum order
    let mut order: Vec<(usize, usize)> = samples
        .iter()
        .enumerate()
        .filter_map(|(position, sample)| {
            let ident = sample.identification()?;
            source.index_of(&ident.native_id).map(|index| (index, position))
        })
        .collect();
    order.sort_unstable();
    if order.len() < samples.len() {
        debug!(
            "{} identifications reference spectra missing from the collection",
            samples.len() - order.len()
        );
    }

    let configurations = source.instrument_configurations();
    let calculator = options.fragments.filter(|_| options.match_fragments);
    let total = source.len();
    let mut enrichment = Enrichment::default();
    let mut cursor = 0;

    while let Some(&(index, _)) = order.get(cursor) {
        progress.report(Stage::Enrichment, index + 1, total)?;

        let spectrum = source.spectrum(index, false)?;
        let ms_level = spectrum.ms_level();
        let high_res = spectrum_is_high_res(&spectrum, configurations, options.assume_high_res);
        let scan_time = spectrum.scan_start_time();
        let mut with_peaks = None;

        while let Some(&(_, position)) = order.get(cursor).filter(|&&(i, _)| i == index) {
            cursor += 1;
            let sample = &mut samples[position];
            if let Some(time) = scan_time {
                sample.set_scan_time(time);
            }
            if let Some(ident) = sample.identification_mut() {
                ident.ms_level = ms_level;
                ident.high_res = high_res;
            }
            enrichment.matched += 1;

            if let (Some(calculator), Some(2), true) = (calculator, ms_level, high_res) {
                if let Some(ident) = sample.identification() {
                    if with_peaks.is_none() {
                        with_peaks = Some(source.spectrum(index, true)?);
                    }
                    if let Some(peaks) = &with_peaks {
                        let found = match_fragments(
                            peaks,
                            &ident.peptide,
                            ident.peptide_length,
                            sample.scan_time(),
                            calculator,
                        );
                        debug!("{}: {} fragment matches", spectrum.id, found.len());
                        enrichment.fragment_samples.extend(found);
                    }
                }
            }
        }
    }

    info!(
        "Matched {} of {} identifications to spectra, {} fragment samples",
        enrichment.matched,
        samples.len(),
        enrichment.fragment_samples.len()
    );
    Ok(enrichment)
}

impl std::fmt::Debug for EnrichOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichOptions")
            .field("assume_high_res", &self.assume_high_res)
            .field("match_fragments", &self.match_fragments)
            .field("fragments", &self.fragments.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlled_vocabulary::{ms_terms, CvParamList};
    use crate::identification::{FragmentIon, IonType, PrecomputedFragments};
    use crate::metadata::{InstrumentComponent, InstrumentConfiguration, ProcessingHistory};
    use crate::refiner::sample::Identification;
    use crate::spectrum::{InMemorySpectrumList, Precursor, Scan, Spectrum};

    fn spectrum(scan: usize, level: u8, time: f64) -> Spectrum {
        spectrum_with_id(scan - 1, &format!("scan={}", scan), level, time)
    }

    fn spectrum_with_id(index: usize, id: &str, level: u8, time: f64) -> Spectrum {
        Spectrum {
            index,
            id: id.to_string(),
            cv_params: CvParamList::new().with(ms_terms::ms_level(level)),
            scans: vec![Scan {
                cv_params: CvParamList::new().with(ms_terms::scan_start_time(time)),
                ..Default::default()
            }],
            precursors: if level > 1 {
                vec![Precursor {
                    activation: CvParamList::new().with(ms_terms::hcd()),
                    ..Default::default()
                }]
            } else {
                Vec::new()
            },
            mz_array: vec![147.1130, 244.1660],
            intensity_array: vec![10.0, 20.0],
        }
    }

    fn sample(scan: usize) -> ErrorSample {
        sample_with_id(scan, &format!("scan={}", scan))
    }

    fn sample_with_id(scan_id: usize, native_id: &str) -> ErrorSample {
        ErrorSample::new(500.0, 500.001, 0.0).with_identification(Identification {
            scan_id,
            native_id: native_id.to_string(),
            rank: 1,
            peptide: "PEPK".to_string(),
            peptide_length: 4,
            ms_level: None,
            high_res: false,
            score_value: 1e-12,
            charge: 2,
        })
    }

    fn list() -> InMemorySpectrumList {
        let config = InstrumentConfiguration::new("IC1")
            .with_component(InstrumentComponent::analyzer(1, ms_terms::orbitrap()));
        let spectra = (1..=6)
            .map(|scan| spectrum(scan, if scan % 3 == 1 { 1 } else { 2 }, scan as f64 * 2.0))
            .collect();
        InMemorySpectrumList::new(vec![config], ProcessingHistory::new(), spectra)
    }

    #[test]
    fn test_scan_times_and_levels_filled() {
        let source = list();
        // Scan 9 is not in the collection and must not block the others
        let mut samples = vec![sample(5), sample(2), sample(9), sample(3)];
        let options = EnrichOptions {
            assume_high_res: false,
            match_fragments: false,
            fragments: None,
        };
        let enrichment = enrich(&mut samples, &source, options, &mut ProgressReporter::silent()).unwrap();

        assert_eq!(enrichment.matched, 3);
        assert!(enrichment.fragment_samples.is_empty());
        let scan_ids: Vec<usize> = samples.iter().filter_map(ErrorSample::scan_id).collect();
        assert_eq!(scan_ids, vec![2, 3, 5, 9]);
        assert_eq!(samples[0].scan_time(), 4.0);
        assert_eq!(samples[2].scan_time(), 10.0);
        assert_eq!(samples[2].identification().unwrap().ms_level, Some(2));
        assert!(samples[2].identification().unwrap().high_res);
        assert_eq!(samples[3].identification().unwrap().ms_level, None);
    }

    #[test]
    fn test_fragments_collected_from_ms2() {
        let source = list();
        let mut table = PrecomputedFragments::new();
        table.insert(
            "PEPK",
            vec![
                FragmentIon { ion: IonType::Y, position: 0, charge: 1, mz: 147.1128 },
                FragmentIon { ion: IonType::Y, position: 1, charge: 1, mz: 244.1656 },
            ],
        );
        let mut samples = vec![sample(1), sample(2), sample(3)];
        let options = EnrichOptions {
            assume_high_res: false,
            match_fragments: true,
            fragments: Some(&table),
        };
        let enrichment = enrich(&mut samples, &source, options, &mut ProgressReporter::silent()).unwrap();

        // Scan 1 is MS1; scans 2 and 3 contribute two matches each
        assert_eq!(enrichment.fragment_samples.len(), 4);
        assert!(enrichment.fragment_samples.iter().any(|s| s.scan_time() == 6.0));
    }

    fn no_fragments() -> EnrichOptions<'static> {
        EnrichOptions {
            assume_high_res: false,
            match_fragments: false,
            fragments: None,
        }
    }

    fn source_of(spectra: Vec<Spectrum>) -> InMemorySpectrumList {
        let config = InstrumentConfiguration::new("IC1")
            .with_component(InstrumentComponent::analyzer(1, ms_terms::orbitrap()));
        InMemorySpectrumList::new(vec![config], ProcessingHistory::new(), spectra)
    }

    #[test]
    fn test_index_native_ids_match_by_id() {
        // No scan numbers in the IDs, and sample scan ids come from file position
        let source = source_of(
            (0..10)
                .map(|i| spectrum_with_id(i, &format!("index={}", i), 2, 100.0 + i as f64))
                .collect(),
        );
        let mut samples: Vec<ErrorSample> = [1, 3, 5, 7, 9]
            .iter()
            .enumerate()
            .map(|(position, i)| sample_with_id(position + 1, &format!("index={}", i)))
            .collect();

        let enrichment = enrich(&mut samples, &source, no_fragments(), &mut ProgressReporter::silent()).unwrap();

        assert_eq!(enrichment.matched, 5);
        let times: Vec<f64> = samples.iter().map(ErrorSample::scan_time).collect();
        assert_eq!(times, vec![101.0, 103.0, 105.0, 107.0, 109.0]);
        assert!(samples.iter().all(|s| s.identification().unwrap().ms_level == Some(2)));
    }

    #[test]
    fn test_scan_numbers_out_of_collection_order() {
        let source = source_of(vec![
            spectrum_with_id(0, "scan=30", 1, 3.0),
            spectrum_with_id(1, "scan=10", 2, 1.0),
            spectrum_with_id(2, "scan=20", 2, 2.0),
        ]);
        let mut samples = vec![sample(20), sample(30), sample(10)];

        let enrichment = enrich(&mut samples, &source, no_fragments(), &mut ProgressReporter::silent()).unwrap();

        assert_eq!(enrichment.matched, 3);
        let times: Vec<(usize, f64)> = samples.iter().map(|s| (s.scan_id().unwrap(), s.scan_time())).collect();
        assert_eq!(times, vec![(10, 1.0), (20, 2.0), (30, 3.0)]);
        assert_eq!(samples[2].identification().unwrap().ms_level, Some(1));
    }

    #[test]
    fn test_missing_spectrum_mid_walk_is_skipped() {
        let source = list();
        let mut samples = vec![
            sample(2),
            sample_with_id(3, "scan=99"),
            sample(4),
            sample(6),
        ];

        let enrichment = enrich(&mut samples, &source, no_fragments(), &mut ProgressReporter::silent()).unwrap();

        assert_eq!(enrichment.matched, 3);
        assert_eq!(samples[0].scan_time(), 4.0);
        assert_eq!(samples[1].scan_time(), 0.0);
        assert_eq!(samples[1].identification().unwrap().ms_level, None);
        assert_eq!(samples[2].scan_time(), 8.0);
        assert_eq!(samples[3].scan_time(), 12.0);
    }
}
