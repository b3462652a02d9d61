//! Single-value ppm shift for a whole run

use crate::refiner::sample::ErrorSample;
use crate::refiner::stats;

/// Histogram bin width, in ppm
pub const HISTOGRAM_BIN_PPM: f64 = 0.5;

/// Histogram half-range, in ppm
pub const HISTOGRAM_RANGE_PPM: f64 = 50.0;

/// Number of histogram bins over `[-50, +50]` ppm
pub const HISTOGRAM_BINS: usize = 201;

/// Half-width of the window around the median that must hold the mode, in ppm
pub const PEAK_WINDOW_PPM: f64 = 10.0;

/// How many times the mean background count the modal bin must reach
pub const PEAK_FACTOR: f64 = 5.0;

fn histogram_bin(ppm: f64) -> usize {
    let index = (ppm + HISTOGRAM_RANGE_PPM) * (1.0 / HISTOGRAM_BIN_PPM) + 0.5;
    (index.max(0.0) as usize).min(HISTOGRAM_BINS - 1)
}

/// Global shift statistics
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalModel {
    histogram: Vec<usize>,
    sample_count: usize,
    shift: f64,
    mean_error: f64,
    mode_error: f64,
    median_error: f64,
    mean_stdev: f64,
    mode_stdev: f64,
    median_stdev: f64,
    mad: f64,
}

impl GlobalModel {
    /// Fit to a sample set; `None` when there are no samples
    pub fn fit(samples: &[ErrorSample]) -> Option<Self> {
        let mut errors: Vec<f64> = samples.iter().map(ErrorSample::ppm_error).collect();
        let median_error = stats::median(&mut errors)?;
        let n = errors.len() as f64;

        let mut histogram = vec![0usize; HISTOGRAM_BINS];
        let mut in_range_sum = 0.0;
        for &ppm in errors
            .iter()
            .filter(|&&ppm| (-HISTOGRAM_RANGE_PPM..=HISTOGRAM_RANGE_PPM).contains(&ppm))
        {
            histogram[histogram_bin(ppm)] += 1;
            in_range_sum += ppm;
        }
        let mean_error = in_range_sum / n;

        let mut mode_error = median_error;
        let mut highest = 0;
        for (i, &count) in histogram.iter().enumerate() {
            if count > highest {
                highest = count;
                mode_error = i as f64 * HISTOGRAM_BIN_PPM - HISTOGRAM_RANGE_PPM;
            }
        }

        let spread = |center: f64| stats::stdev_around(&errors, center).unwrap_or(0.0);
        Some(Self {
            sample_count: errors.len(),
            shift: median_error,
            mean_stdev: spread(mean_error),
            mode_stdev: spread(mode_error),
            median_stdev: spread(median_error),
            mad: stats::mad(&errors, median_error).unwrap_or(0.0),
            histogram,
            mean_error,
            mode_error,
            median_error,
        })
    }

    /// Whether the ppm error histogram has a clear peak at the median.
    ///
    /// The modal bin must lie within ±10 ppm of the median bin, and its count
    /// must reach five times the mean count of the non-empty bins outside that
    /// window. A histogram with nothing outside the window passes.
    pub fn check_for_peak(&self) -> bool {
        if self.sample_count == 0 {
            return false;
        }
        let window = (PEAK_WINDOW_PPM / HISTOGRAM_BIN_PPM) as usize;
        let median_bin = histogram_bin(self.shift);
        let low = median_bin.saturating_sub(window);
        let high = if median_bin < HISTOGRAM_BINS - window {
            median_bin + window
        } else {
            HISTOGRAM_BINS - 1
        };

        let max_bin = histogram_bin(self.mode_error);
        if max_bin < low || high < max_bin {
            return false;
        }

        let outside: Vec<usize> = self
            .histogram
            .iter()
            .enumerate()
            .filter(|&(i, &count)| (i < low || i > high) && count > 0)
            .map(|(_, &count)| count)
            .collect();
        if outside.is_empty() {
            return true;
        }
        let average = outside.iter().sum::<usize>() as f64 / outside.len() as f64;
        self.histogram[max_bin] as f64 >= average * PEAK_FACTOR
    }

    /// The ppm shift applied to every m/z
    pub fn shift_ppm(&self) -> f64 {
        self.shift
    }

    /// Correct a mass by the global ppm shift
    pub fn shift(&self, mass: f64) -> f64 {
        mass * (1.0 - self.shift / 1.0e6)
    }

    /// Spread around the median, the error the binned models try to beat
    pub fn stdev(&self) -> f64 {
        self.median_stdev
    }

    /// Median absolute deviation around the median
    pub fn mad(&self) -> f64 {
        self.mad
    }

    /// Number of samples fitted
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Mean ppm error over the histogram range
    pub fn mean_error(&self) -> f64 {
        self.mean_error
    }

    /// Centre of the most populated histogram bin
    pub fn mode_error(&self) -> f64 {
        self.mode_error
    }

    /// Median ppm error
    pub fn median_error(&self) -> f64 {
        self.median_error
    }

    /// Spread around the mean
    pub fn mean_stdev(&self) -> f64 {
        self.mean_stdev
    }

    /// Spread around the mode
    pub fn mode_stdev(&self) -> f64 {
        self.mode_stdev
    }

    /// Histogram counts, 0.5 ppm bins from -50 ppm
    pub fn histogram(&self) -> &[usize] {
        &self.histogram
    }
}
