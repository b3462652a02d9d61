//! Robust summary statistics over ppm errors

/// Median of the values; sorts them ascending in place.
///
/// Odd lengths return the middle element, even lengths the mean of the two
/// central elements. Returns `None` for an empty slice.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Median absolute deviation of the values around `center`
pub fn mad(values: &[f64], center: f64) -> Option<f64> {
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&mut deviations)
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation of the values around an arbitrary center
pub fn stdev_around(values: &[f64], center: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - center).powi(2)).sum();
    Some((sum_sq / values.len() as f64).sqrt())
}

/// Percent reduction of `value` relative to `baseline` magnitude
pub fn percent_improvement(baseline: f64, value: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    100.0 * (baseline.abs() - value.abs()) / baseline.abs()
}
