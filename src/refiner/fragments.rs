//! Fragment ion matching for MS2 calibration samples

use std::borrow::Cow;

use crate::controlled_vocabulary::{accession, CvParamList};
use crate::identification::{FragmentMassCalculator, IonType};
use crate::spectrum::Spectrum;

use super::sample::ErrorSample;

/// Largest accepted fragment mass error, in Da
pub const FRAGMENT_MAX_MASS_ERROR_DA: f64 = 0.2;

/// Largest accepted fragment ppm error
pub const FRAGMENT_MAX_PPM_ERROR: f64 = 50.0;

/// Highest fragment charge looked for
pub const FRAGMENT_MAX_CHARGE: u8 = 3;

/// Peaks examined on each side of the lookup position
pub const PEAK_NEIGHBOURHOOD: usize = 10;

/// Fragment series expected for the dissociation methods of an activation
pub fn ion_types_for(activation: &CvParamList) -> Vec<IonType> {
    let collisional = [
        accession::CID,
        accession::HCD,
        accession::TRAP_TYPE_CID,
        accession::HIGHER_ENERGY_CID,
    ]
    .iter()
    .any(|acc| activation.contains(acc));
    let electron = activation.contains(accession::ETD) || activation.contains(accession::ECD);

    match (collisional, electron) {
        (true, true) => vec![IonType::B, IonType::C, IonType::Y, IonType::Z],
        (false, true) => vec![IonType::C, IonType::Z],
        _ => vec![IonType::B, IonType::Y],
    }
}

/// Sorted, finite peak list searched around integer m/z slots
#[derive(Debug)]
pub struct PeakIndex<'a> {
    mz: Cow<'a, [f64]>,
}

impl<'a> PeakIndex<'a> {
    /// Index an m/z array. Non-finite values are dropped, and a copy is
    /// sorted if the input is not ascending.
    pub fn new(mz: &'a [f64]) -> Self {
        let usable = mz.iter().all(|v| v.is_finite()) && mz.windows(2).all(|w| w[0] <= w[1]);
        let mz: Cow<'a, [f64]> = if usable {
            Cow::Borrowed(mz)
        } else {
            let mut sorted: Vec<f64> = mz.iter().copied().filter(|v| v.is_finite()).collect();
            sorted.sort_by(|a, b| a.total_cmp(b));
            Cow::Owned(sorted)
        };
        Self { mz }
    }

    /// Number of indexed peaks
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    /// Whether no peaks were indexed
    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// The peak closest to `target` among the neighbourhood of the first
    /// peak at or above `target`'s integer m/z
    pub fn closest(&self, target: f64) -> Option<f64> {
        if self.mz.is_empty() || !target.is_finite() {
            return None;
        }
        let slot = target.max(0.0).floor();
        let center = self.mz.partition_point(|&value| value < slot);
        let start = center.saturating_sub(PEAK_NEIGHBOURHOOD);
        let end = center.saturating_add(PEAK_NEIGHBOURHOOD).min(self.mz.len() - 1);
        self.mz[start..=end]
            .iter()
            .copied()
            .min_by(|a, b| (a - target).abs().total_cmp(&(b - target).abs()))
    }
}

/// Match the theoretical fragments of `peptide` against the peaks of a spectrum.
///
/// Returns one sample per accepted match, tagged with `scan_time`.
pub fn match_fragments(
    spectrum: &Spectrum,
    peptide: &str,
    peptide_length: usize,
    scan_time: f64,
    calculator: &dyn FragmentMassCalculator,
) -> Vec<ErrorSample> {
    if spectrum.mz_array.is_empty() {
        return Vec::new();
    }
    let ion_types = spectrum
        .precursors
        .first()
        .map_or_else(|| vec![IonType::B, IonType::Y], |p| ion_types_for(&p.activation));
    let peaks = PeakIndex::new(&spectrum.mz_array);

    let mut samples = Vec::new();
    for &ion in &ion_types {
        // Ion indices 0..length; the last one spans the whole peptide
        for position in 0..peptide_length {
            for charge in 1..=FRAGMENT_MAX_CHARGE {
                let Some(theoretical) = calculator.fragment_mz(peptide, ion, position, charge) else {
                    continue;
                };
                let Some(observed) = peaks.closest(theoretical) else {
                    continue;
                };
                let sample = ErrorSample::new(theoretical, observed, scan_time);
                if sample.mass_error().abs() <= FRAGMENT_MAX_MASS_ERROR_DA
                    && sample.ppm_error().abs() <= FRAGMENT_MAX_PPM_ERROR
                {
                    samples.push(sample);
                }
            }
        }
    }
    samples
}
