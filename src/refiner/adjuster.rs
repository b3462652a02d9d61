//! Read-time m/z adjustment
//!
//! Every spectrum read through the refiner passes through
//! [`ValueAdjuster::adjust`]. The adjuster only reads the fitted models, so
//! one instance serves any number of concurrent readers.

use crate::controlled_vocabulary::{accession, CvParamList, THERMO_MONOISOTOPIC_MZ};
use crate::metadata::InstrumentConfiguration;
use crate::spectrum::{SourceError, Spectrum, SpectrumSource};

use super::model::CalibrationModel;

/// Whether any configuration records with a high-resolution analyzer
pub fn any_high_res(configurations: &[InstrumentConfiguration]) -> bool {
    configurations.iter().any(InstrumentConfiguration::is_high_res)
}

/// Whether a spectrum was recorded at high resolution.
///
/// A spectrum is high resolution when any of its scans references a
/// high-resolution configuration. Scans without a reference use the first
/// configuration of the collection.
pub fn spectrum_is_high_res(
    spectrum: &Spectrum,
    configurations: &[InstrumentConfiguration],
    assume_high_res: bool,
) -> bool {
    if assume_high_res {
        return true;
    }
    let default = configurations.first();
    let lookup = |reference: Option<&String>| match reference {
        Some(id) => configurations.iter().find(|c| &c.id == id).or(default),
        None => default,
    };
    if spectrum.scans.is_empty() {
        return default.is_some_and(InstrumentConfiguration::is_high_res);
    }
    spectrum
        .scans
        .iter()
        .filter_map(|scan| lookup(scan.instrument_configuration_ref.as_ref()))
        .any(InstrumentConfiguration::is_high_res)
}

fn shift_term(params: &mut CvParamList, accession: &str, model: &CalibrationModel, scan_time: f64) {
    if let Some(term) = params.get_mut(accession) {
        if let Some(value) = term.value_as_f64() {
            term.set_value(model.shift(scan_time, value));
        }
    }
}

/// Applies the MS1 and MS2 models to spectra
#[derive(Debug, Clone, PartialEq)]
pub struct ValueAdjuster {
    ms1: CalibrationModel,
    ms2: CalibrationModel,
    ms_levels: Vec<u8>,
    assume_high_res: bool,
}

impl ValueAdjuster {
    /// Create an adjuster for the given models and enabled MS levels
    pub fn new(
        ms1: CalibrationModel,
        ms2: CalibrationModel,
        ms_levels: Vec<u8>,
        assume_high_res: bool,
    ) -> Self {
        Self {
            ms1,
            ms2,
            ms_levels,
            assume_high_res,
        }
    }

    /// Model applied to MS1 data and precursor m/z values
    pub fn ms1_model(&self) -> &CalibrationModel {
        &self.ms1
    }

    /// Model applied to MSn peak lists
    pub fn ms2_model(&self) -> &CalibrationModel {
        &self.ms2
    }

    fn refines(&self, level: u8) -> bool {
        self.ms_levels.contains(&level)
    }

    /// Rewrite the m/z-bearing fields of a spectrum in place.
    ///
    /// `source` resolves precursor spectra; only their metadata is read.
    pub fn adjust<S: SpectrumSource + ?Sized>(&self, spectrum: &mut Spectrum, source: &S) -> Result<(), SourceError> {
        let configurations = source.instrument_configurations();
        // Spectra without an MS level are adjusted as MS1
        let level = spectrum.ms_level().unwrap_or(1);
        let scan_time = spectrum.scan_start_time().unwrap_or(0.0);
        let high_res = spectrum_is_high_res(spectrum, configurations, self.assume_high_res);

        if high_res && self.refines(level) {
            let model = if level == 1 { &self.ms1 } else { &self.ms2 };
            for acc in [
                accession::BASE_PEAK_MZ,
                accession::LOWEST_OBSERVED_MZ,
                accession::HIGHEST_OBSERVED_MZ,
            ] {
                shift_term(&mut spectrum.cv_params, acc, model, scan_time);
            }
            for mz in spectrum.mz_array.iter_mut() {
                *mz = model.shift(scan_time, *mz);
            }
        }

        if level < 2 {
            return Ok(());
        }

        let mut precursor_time = None;
        for precursor in spectrum.precursors.iter_mut() {
            if precursor.external_source_file_ref.is_some() {
                continue;
            }
            let parent = match precursor.spectrum_ref.as_deref().and_then(|id| source.index_of(id)) {
                Some(index) => Some(source.spectrum(index, false)?),
                None => None,
            };
            let (parent_level, parent_high_res, parent_time) = match &parent {
                Some(parent) => (
                    parent.ms_level().unwrap_or(level - 1),
                    spectrum_is_high_res(parent, configurations, self.assume_high_res),
                    parent.scan_start_time().unwrap_or(scan_time),
                ),
                None => (level - 1, high_res, scan_time),
            };
            if !parent_high_res || !self.refines(parent_level) {
                continue;
            }

            shift_term(
                &mut precursor.isolation_window,
                accession::ISOLATION_WINDOW_TARGET_MZ,
                &self.ms1,
                parent_time,
            );
            for ion in precursor.selected_ions.iter_mut() {
                shift_term(ion, accession::SELECTED_ION_MZ, &self.ms1, parent_time);
            }
            precursor_time.get_or_insert(parent_time);
        }

        if let Some(parent_time) = precursor_time {
            for param in spectrum
                .scans
                .iter_mut()
                .flat_map(|scan| scan.user_params.iter_mut())
                .filter(|param| param.name == THERMO_MONOISOTOPIC_MZ)
            {
                if let Some(value) = param.value_as_f64() {
                    param.value = self.ms1.shift(parent_time, value).to_string();
                }
            }
        }
        Ok(())
    }
}
