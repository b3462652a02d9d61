//! Isotope miscall repair
//!
//! Some search engines report the m/z of an isotope peak instead of the
//! monoisotopic one. The experimental m/z is then off by roughly `k / z` Da.
//! When the observed error lands within a narrow window of such an offset
//! the sample is moved back by that offset.

use super::sample::ErrorSample;

/// Half-width of the acceptance window around each isotope offset, in Da
pub const ISOTOPE_WINDOW_DA: f64 = 0.05;

/// Highest isotope offset tried
pub const MAX_ISOTOPE_OFFSET: i32 = 5;

/// Try to move an isotope-miscalled sample back onto the monoisotopic peak.
///
/// Returns whether the sample was changed. Uncharged samples are never touched.
pub fn try_correct(sample: &mut ErrorSample, charge: i32) -> bool {
    if charge == 0 {
        return false;
    }
    let mass_error = sample.mass_error();
    let signed_charge = if mass_error < 0.0 {
        -f64::from(charge)
    } else {
        f64::from(charge)
    };

    for k in 1..=MAX_ISOTOPE_OFFSET {
        let adjustment = f64::from(k) / signed_charge;
        if adjustment - ISOTOPE_WINDOW_DA <= mass_error && mass_error <= adjustment + ISOTOPE_WINDOW_DA {
            sample.shift_exper_mz(-adjustment);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEUTRON: f64 = 1.003355;

    #[test]
    fn test_corrects_positive_miscall() {
        let calc = 600.0;
        let mut sample = ErrorSample::new(calc, calc + NEUTRON / 2.0 + 0.002, 0.0);
        assert!(try_correct(&mut sample, 2));
        assert!(sample.mass_error().abs() < 0.01);
        assert_eq!(sample.mass_error(), sample.exper_mz() - sample.calc_mz());
    }

    #[test]
    fn test_corrects_negative_miscall() {
        let calc = 800.0;
        let mut sample = ErrorSample::new(calc, calc - 2.0 * NEUTRON / 3.0, 0.0);
        assert!(try_correct(&mut sample, 3));
        assert!(sample.mass_error().abs() < 0.01);
    }

    #[test]
    fn test_leaves_unmatched_errors() {
        let mut sample = ErrorSample::new(700.0, 700.3, 0.0);
        assert!(!try_correct(&mut sample, 2));
        assert_eq!(sample.exper_mz(), 700.3);

        let mut uncharged = ErrorSample::new(700.0, 701.0, 0.0);
        assert!(!try_correct(&mut uncharged, 0));
    }
}
