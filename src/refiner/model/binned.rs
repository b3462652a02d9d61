//! Piecewise ppm shifts over scan time or m/z
//!
//! Samples are binned by a dependency value. Each bin gets the median ppm
//! error of its members, then every bin inside the populated range is
//! replaced by the count-weighted mean of a symmetric neighbourhood that
//! grows until it holds at least [`SMOOTHING_MIN_COUNT`] samples. Shifts
//! are interpolated linearly between bin centres.

use std::fmt;

use crate::refiner::error::RefinerError;
use crate::refiner::ingest::MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT;
use crate::refiner::progress::{ProgressReporter, Stage};
use crate::refiner::sample::ErrorSample;
use crate::refiner::stats;

use super::global::GlobalModel;

/// Bin width of the scan time model, in seconds
pub const SCAN_TIME_BIN_WIDTH: f64 = 75.0;

/// Bin width of the m/z model, in Th
pub const MZ_BIN_WIDTH: f64 = 25.0;

/// Neighbourhood size the smoother grows to, in samples
pub const SMOOTHING_MIN_COUNT: usize = 100;

/// Bins holding more than this many samples are trusted by the noise cleaner
pub const NOISE_TRUSTED_COUNT: usize = 20;

/// Extra bins allocated past the last populated one
const TRAILING_BINS: usize = 4;

/// Fit steps reported to progress callbacks
const FIT_STEPS: usize = 4;

/// What a binned model is a function of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// Scan start time of the identified spectrum
    ScanTime,
    /// Experimental m/z
    MassToCharge,
}

impl Dependency {
    /// Bin width in the dependency's unit
    pub fn bin_width(&self) -> f64 {
        match self {
            Dependency::ScanTime => SCAN_TIME_BIN_WIDTH,
            Dependency::MassToCharge => MZ_BIN_WIDTH,
        }
    }

    /// The dependency value of a sample
    pub fn value_of(&self, sample: &ErrorSample) -> f64 {
        match self {
            Dependency::ScanTime => sample.scan_time(),
            Dependency::MassToCharge => sample.exper_mz(),
        }
    }

    /// Short name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Dependency::ScanTime => "scan time",
            Dependency::MassToCharge => "m/z",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global statistics a binned model starts from and is compared against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalSeeds {
    /// Global ppm shift, the value of every unpopulated bin
    pub shift: f64,
    /// Global standard deviation
    pub stdev: f64,
    /// Global median absolute deviation
    pub mad: f64,
}

impl From<&GlobalModel> for GlobalSeeds {
    fn from(global: &GlobalModel) -> Self {
        Self {
            shift: global.shift_ppm(),
            stdev: global.stdev(),
            mad: global.mad(),
        }
    }
}

/// One dependency bin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    /// Number of samples in the bin
    pub count: usize,
    /// Median ppm error of the members, or the global shift when empty
    pub raw_shift: f64,
    /// Shift after smoothing
    pub smoothed_shift: f64,
    /// Whether the smoother assigned this bin
    pub valid: bool,
}

/// Spread of the samples around their bin shifts
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinStats {
    /// Mean of the per-bin standard deviations
    pub stdev: f64,
    /// Median of the per-bin median absolute deviations
    pub mad: f64,
    /// Percent improvement of `stdev` over the global standard deviation
    pub stdev_improvement: f64,
    /// Percent improvement of `mad` over the global MAD
    pub mad_improvement: f64,
}

/// Fitted binned model
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedModel {
    dependency: Dependency,
    seeds: GlobalSeeds,
    bins: Vec<Bin>,
    lowest_valid_bin: usize,
    highest_valid_bin: usize,
    highest_count_bin: usize,
    rough: BinStats,
    smoothed: BinStats,
}

impl BinnedModel {
    /// Fit a model to samples.
    ///
    /// Fails with [`RefinerError::InsufficientData`] on an empty sample set and
    /// with [`RefinerError::Cancelled`] when the progress callback cancels.
    pub fn fit(
        dependency: Dependency,
        samples: &[ErrorSample],
        seeds: GlobalSeeds,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<Self, RefinerError> {
        Self::fit_with(dependency, samples, seeds, false, progress)
    }

    /// Fit a model, wiping noisy edge bins before smoothing
    pub fn fit_with_noise_cleaning(
        dependency: Dependency,
        samples: &[ErrorSample],
        seeds: GlobalSeeds,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<Self, RefinerError> {
        Self::fit_with(dependency, samples, seeds, true, progress)
    }

    fn fit_with(
        dependency: Dependency,
        samples: &[ErrorSample],
        seeds: GlobalSeeds,
        clean_noise: bool,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<Self, RefinerError> {
        let width = dependency.bin_width();
        let bin_of = |value: f64| (value / width) as usize;

        let indexed: Vec<(usize, f64)> = samples
            .iter()
            .map(|s| (bin_of(dependency.value_of(s)), s.ppm_error()))
            .collect();
        let (lowest, highest) = match (
            indexed.iter().map(|&(bin, _)| bin).min(),
            indexed.iter().map(|&(bin, _)| bin).max(),
        ) {
            (Some(lowest), Some(highest)) => (lowest, highest),
            _ => {
                return Err(RefinerError::InsufficientData {
                    found: 0,
                    required: MINIMUM_RESULTS_FOR_DEPENDENT_SHIFT,
                })
            }
        };

        let mut members: Vec<Vec<f64>> = vec![Vec::new(); highest + TRAILING_BINS];
        for (bin, ppm) in indexed {
            members[bin].push(ppm);
        }
        progress.report(Stage::BinnedFit, 1, FIT_STEPS)?;

        let mut model = Self {
            dependency,
            seeds,
            bins: Vec::with_capacity(members.len()),
            lowest_valid_bin: lowest,
            highest_valid_bin: highest,
            highest_count_bin: lowest,
            rough: BinStats::default(),
            smoothed: BinStats::default(),
        };

        let mut highest_count = 0;
        for (index, bin_members) in members.iter_mut().enumerate() {
            let raw_shift = stats::median(bin_members).unwrap_or(seeds.shift);
            if bin_members.len() > highest_count {
                highest_count = bin_members.len();
                model.highest_count_bin = index;
            }
            model.bins.push(Bin {
                count: bin_members.len(),
                raw_shift,
                smoothed_shift: raw_shift,
                valid: false,
            });
        }

        if clean_noise {
            model.clean_noise();
        }

        model.rough = model.stats(&members, |bin| bin.raw_shift);
        progress.report(Stage::BinnedFit, 2, FIT_STEPS)?;

        model.smooth();
        progress.report(Stage::BinnedFit, 3, FIT_STEPS)?;

        model.smoothed = model.stats(&members, |bin| bin.smoothed_shift);
        progress.report(Stage::BinnedFit, 4, FIT_STEPS)?;

        Ok(model)
    }

    /// Per-bin spread around `shift_of`, summarised over the populated range
    fn stats(&self, members: &[Vec<f64>], shift_of: impl Fn(&Bin) -> f64) -> BinStats {
        let mut stdevs = Vec::new();
        let mut mads = Vec::new();
        for index in self.lowest_valid_bin..=self.highest_valid_bin {
            let bin = &self.bins[index];
            if bin.count == 0 {
                continue;
            }
            let center = shift_of(bin);
            if let (Some(stdev), Some(mad)) = (
                stats::stdev_around(&members[index], center),
                stats::mad(&members[index], center),
            ) {
                stdevs.push(stdev);
                mads.push(mad);
            }
        }

        let stdev = stats::mean(&stdevs).unwrap_or(self.seeds.stdev);
        let mad = stats::median(&mut mads).unwrap_or(self.seeds.mad);
        BinStats {
            stdev,
            mad,
            stdev_improvement: stats::percent_improvement(self.seeds.stdev, stdev),
            mad_improvement: stats::percent_improvement(self.seeds.mad, mad),
        }
    }

    /// Replace each bin in the populated range by a count-weighted
    /// neighbourhood mean of raw shifts.
    fn smooth(&mut self) {
        let len = self.bins.len();
        let (lowest, highest) = (self.lowest_valid_bin, self.highest_valid_bin);

        let smoothed: Vec<Option<f64>> = (0..len)
            .map(|i| {
                if i < lowest || i > highest {
                    return None;
                }
                let mut count = self.bins[i].count;
                let mut sum = self.bins[i].raw_shift * count as f64;
                let mut j = 1;
                while (j < 2 || count < SMOOTHING_MIN_COUNT) && j < len {
                    if i + j <= highest {
                        let bin = &self.bins[i + j];
                        sum += bin.raw_shift * bin.count as f64;
                        count += bin.count;
                    }
                    if let Some(below) = i.checked_sub(j).filter(|&b| b >= lowest) {
                        let bin = &self.bins[below];
                        sum += bin.raw_shift * bin.count as f64;
                        count += bin.count;
                    }
                    j += 1;
                }
                Some(if count > 0 {
                    sum / count as f64
                } else {
                    self.bins[i].raw_shift
                })
            })
            .collect();

        for (bin, shift) in self.bins.iter_mut().zip(smoothed) {
            match shift {
                Some(shift) => {
                    bin.smoothed_shift = shift;
                    bin.valid = true;
                }
                None => {
                    bin.smoothed_shift = self.seeds.shift;
                    bin.valid = false;
                }
            }
        }
    }

    /// Walk outwards from the fullest bin, resetting bins whose shift jumps
    /// away from the last accepted one and truncating the valid range at
    /// the first gap or second consecutive jump.
    fn clean_noise(&mut self) {
        let start = self.highest_count_bin;
        self.clean_noise_from(start, false);
        self.clean_noise_from(start, true);
    }

    fn clean_noise_from(&mut self, start: usize, upwards: bool) {
        let tolerance = if self.seeds.stdev < 3.0 {
            self.seeds.stdev * 2.0
        } else {
            self.seeds.stdev
        };
        let global_shift = self.seeds.shift;

        let indices: Box<dyn Iterator<Item = usize>> = if upwards {
            Box::new(start..self.bins.len())
        } else {
            Box::new((0..=start).rev())
        };

        let mut last_accepted = start;
        let mut wipeout = false;
        for i in indices {
            let last_shift = self.bins[last_accepted].raw_shift;
            let bin = &mut self.bins[i];
            if wipeout {
                bin.raw_shift = global_shift;
                bin.count = 0;
            } else if bin.count > NOISE_TRUSTED_COUNT {
                last_accepted = i;
            } else if bin.count > 0 {
                if (bin.raw_shift - last_shift).abs() > tolerance {
                    bin.raw_shift = global_shift;
                    bin.count = 0;
                    if i.abs_diff(last_accepted) > 1 {
                        wipeout = true;
                    }
                } else {
                    last_accepted = i;
                }
            } else if i.abs_diff(last_accepted) > 1 {
                wipeout = true;
            }
        }

        if upwards {
            self.highest_valid_bin = last_accepted;
        } else {
            self.lowest_valid_bin = last_accepted;
        }
    }

    /// ppm shift at a dependency value.
    ///
    /// Values inside the outer half-bins of the populated range interpolate
    /// between neighbouring bin centres; values beyond it clamp to the edge bin.
    pub fn bin_shift(&self, dependency: f64) -> f64 {
        let width = self.dependency.bin_width();
        let half = width / 2.0;
        let (lowest, highest) = (self.lowest_valid_bin, self.highest_valid_bin);
        let use_bin = (dependency / width) as usize;
        let shift_at = |index: usize| {
            self.bins
                .get(index)
                .map_or(self.seeds.shift, |bin| bin.smoothed_shift)
        };

        if use_bin < lowest {
            return shift_at(lowest);
        }
        if use_bin > highest {
            return shift_at(highest);
        }
        if dependency <= lowest as f64 * width + half || dependency >= highest as f64 * width + half {
            return shift_at(use_bin);
        }

        let center = use_bin as f64 * width + half;
        let (low, high) = if dependency < center {
            (use_bin - 1, use_bin)
        } else if dependency > center {
            (use_bin, use_bin + 1)
        } else {
            return shift_at(use_bin);
        };
        let low_center = low as f64 * width + half;
        let high_center = high as f64 * width + half;
        let fraction = (dependency - low_center) / (high_center - low_center);
        shift_at(low) + fraction * (shift_at(high) - shift_at(low))
    }

    /// Correct a mass observed at a dependency value
    pub fn shift(&self, dependency: f64, mass: f64) -> f64 {
        mass * (1.0 - self.bin_shift(dependency) / 1.0e6)
    }

    /// `"min to max"` over the smoothed shifts of valid bins
    pub fn shift_range(&self) -> String {
        let (min, max) = self
            .bins
            .iter()
            .filter(|bin| bin.valid)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), bin| {
                (min.min(bin.smoothed_shift), max.max(bin.smoothed_shift))
            });
        if min > max {
            return format!("{} to {}", self.seeds.shift, self.seeds.shift);
        }
        format!("{} to {}", min, max)
    }

    /// The dependency this model is a function of
    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    /// The global statistics the model was seeded with
    pub fn seeds(&self) -> GlobalSeeds {
        self.seeds
    }

    /// All bins, indexed by `floor(value / bin_width)`
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// First bin of the populated range
    pub fn lowest_valid_bin(&self) -> usize {
        self.lowest_valid_bin
    }

    /// Last bin of the populated range
    pub fn highest_valid_bin(&self) -> usize {
        self.highest_valid_bin
    }

    /// First bin holding the most samples
    pub fn highest_count_bin(&self) -> usize {
        self.highest_count_bin
    }

    /// Spread around the raw bin medians
    pub fn rough_stats(&self) -> BinStats {
        self.rough
    }

    /// Spread around the smoothed shifts
    pub fn smoothed_stats(&self) -> BinStats {
        self.smoothed
    }

    /// Final standard deviation
    pub fn stdev(&self) -> f64 {
        self.smoothed.stdev
    }

    /// Final median absolute deviation
    pub fn mad(&self) -> f64 {
        self.smoothed.mad
    }

    /// Percent improvement of the smoothed MAD over the global MAD
    pub fn percent_improvement(&self) -> f64 {
        self.smoothed.mad_improvement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mz: f64, ppm: f64, scan_time: f64) -> ErrorSample {
        ErrorSample::new(mz, mz * (1.0 + ppm / 1.0e6), scan_time)
    }

    fn seeds(shift: f64) -> GlobalSeeds {
        GlobalSeeds {
            shift,
            stdev: 4.0,
            mad: 3.0,
        }
    }

    /// Shift drifts linearly from 0 to 10 ppm over 0..1500 s
    fn drifting_samples() -> Vec<ErrorSample> {
        (0..1500)
            .map(|i| {
                let t = i as f64;
                let jitter = if i % 2 == 0 { 0.5 } else { -0.5 };
                sample(500.0 + (i % 40) as f64, t / 150.0 + jitter, t)
            })
            .collect()
    }

    #[test]
    fn test_scan_time_binning() {
        let samples = drifting_samples();
        let model = BinnedModel::fit(Dependency::ScanTime, &samples, seeds(5.0), &mut ProgressReporter::silent())
            .unwrap();
        assert_eq!(model.lowest_valid_bin(), 0);
        assert_eq!(model.highest_valid_bin(), 19);
        assert_eq!(model.bins().len(), 23);
        assert_eq!(model.bins()[0].count, 75);
        assert!(model.bins()[..20].iter().all(|b| b.valid));
        assert!(!model.bins()[20].valid);
        assert_eq!(model.bins()[21].smoothed_shift, 5.0);

        // Tracks the drift far better than a single global value
        assert!(model.bin_shift(100.0) < model.bin_shift(1400.0));
        assert!(model.percent_improvement() > 3.0);
        assert!(model.smoothed_stats().stdev < 4.0);
    }

    #[test]
    fn test_bin_shift_clamps_and_interpolates() {
        let samples = drifting_samples();
        let model = BinnedModel::fit(Dependency::ScanTime, &samples, seeds(5.0), &mut ProgressReporter::silent())
            .unwrap();
        let first = model.bins()[0].smoothed_shift;
        let last = model.bins()[19].smoothed_shift;
        assert_eq!(model.bin_shift(10.0), first);
        assert_eq!(model.bin_shift(5000.0), last);

        let a = model.bins()[4].smoothed_shift;
        let b = model.bins()[5].smoothed_shift;
        let midway = model.bin_shift(4.0 * 75.0 + 37.5 + 37.5);
        assert!((midway - (a + b) / 2.0).abs() < 1e-9);
        assert_eq!(model.bin_shift(4.0 * 75.0 + 37.5), a);
    }

    #[test]
    fn test_mass_to_charge_dependency() {
        let samples: Vec<ErrorSample> = (0..600)
            .map(|i| {
                let mz = 400.0 + i as f64;
                sample(mz, (mz - 400.0) / 100.0, 0.0)
            })
            .collect();
        let model =
            BinnedModel::fit(Dependency::MassToCharge, &samples, seeds(3.0), &mut ProgressReporter::silent())
                .unwrap();
        assert_eq!(model.lowest_valid_bin(), 16);
        let corrected = model.shift(900.0, 900.0);
        assert!(corrected < 900.0);
        assert!(model.bin_shift(420.0) < model.bin_shift(980.0));
    }

    #[test]
    fn test_constant_shift_survives_smoothing() {
        let samples: Vec<ErrorSample> = (0..800).map(|i| sample(600.0, 2.0, i as f64)).collect();
        let model = BinnedModel::fit(Dependency::ScanTime, &samples, seeds(2.0), &mut ProgressReporter::silent())
            .unwrap();
        for bin in model.bins().iter().filter(|b| b.valid) {
            assert!((bin.smoothed_shift - 2.0).abs() < 1e-6);
        }
        let range = model.shift_range();
        let (min, max) = range.split_once(" to ").unwrap();
        assert!((min.parse::<f64>().unwrap() - 2.0).abs() < 1e-6);
        assert!((max.parse::<f64>().unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_noise_cleaning_truncates_sparse_tail() {
        let mut samples: Vec<ErrorSample> = (0..600).map(|i| sample(600.0, 1.0, (i % 300) as f64)).collect();
        // A far away, sparse, badly shifted cluster
        samples.extend((0..3).map(|_| sample(600.0, 40.0, 900.0)));
        let seeds = GlobalSeeds {
            shift: 1.0,
            stdev: 1.0,
            mad: 1.0,
        };

        let plain = BinnedModel::fit(Dependency::ScanTime, &samples, seeds, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(plain.highest_valid_bin(), 12);

        let cleaned =
            BinnedModel::fit_with_noise_cleaning(Dependency::ScanTime, &samples, seeds, &mut ProgressReporter::silent())
                .unwrap();
        assert_eq!(cleaned.highest_valid_bin(), 3);
        assert_eq!(cleaned.bins()[12].count, 0);
    }

    #[test]
    fn test_empty_samples_rejected() {
        let err = BinnedModel::fit(Dependency::ScanTime, &[], seeds(0.0), &mut ProgressReporter::silent()).unwrap_err();
        assert!(matches!(err, RefinerError::InsufficientData { found: 0, .. }));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn uniform_bins_are_a_smoothing_fixed_point(
                shift in -20.0f64..20.0,
                times in prop::collection::vec(0.0f64..3000.0, 50..300),
            ) {
                let samples: Vec<ErrorSample> = times.iter().map(|&t| sample(700.0, shift, t)).collect();
                let model = BinnedModel::fit(
                    Dependency::ScanTime,
                    &samples,
                    seeds(shift),
                    &mut ProgressReporter::silent(),
                ).unwrap();
                for bin in model.bins() {
                    prop_assert!((bin.smoothed_shift - shift).abs() < 1e-6);
                }
            }

            #[test]
            fn bin_shift_stays_within_valid_bins(t in -100.0f64..5000.0) {
                let samples = drifting_samples();
                let model = BinnedModel::fit(
                    Dependency::ScanTime,
                    &samples,
                    seeds(5.0),
                    &mut ProgressReporter::silent(),
                ).unwrap();
                let valid: Vec<f64> = model.bins().iter().filter(|b| b.valid).map(|b| b.smoothed_shift).collect();
                let min = valid.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = valid.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let s = model.bin_shift(t);
                prop_assert!(s >= min - 1e-9 && s <= max + 1e-9);
            }
        }
    }
}
