//! Score-based acceptance of identification hits
//!
//! A [`ScoreThreshold`] is immutable. Relaxing it produces a new threshold
//! with scaled bounds and one more step counted, so each ingestion pass works
//! against a fixed value.

use std::cmp::Ordering;
use std::fmt;

use log::info;

use crate::identification::{resolve_score, IdentificationHit, ScoreTerm};

use super::range::{parse_range, RangeSyntaxError, ScoreRange};
use super::sample::Identification;

/// How a threshold locates its score on a hit
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreSelector {
    /// A resolved CV term, matched by accession
    Cv(ScoreTerm),
    /// Free text, matched case-insensitively against the end of parameter names
    Name(String),
}

impl ScoreSelector {
    /// Resolve a user-supplied score name for the reporting software
    pub fn resolve(software: Option<&str>, name: &str) -> Self {
        match resolve_score(software, name) {
            Some(term) => ScoreSelector::Cv(term),
            None => ScoreSelector::Name(name.to_string()),
        }
    }

    /// The score name: the CV term name, or the free text as given
    pub fn name(&self) -> &str {
        match self {
            ScoreSelector::Cv(term) => term.name,
            ScoreSelector::Name(name) => name,
        }
    }

    /// Find the score value on a hit
    pub fn score_of(&self, hit: &IdentificationHit) -> Option<f64> {
        match self {
            ScoreSelector::Cv(term) => hit.cv_params.get(term.accession)?.value_as_f64(),
            ScoreSelector::Name(name) => {
                let suffix = name.to_lowercase();
                hit.user_params
                    .iter()
                    .find(|p| p.name.to_lowercase().ends_with(&suffix))
                    .and_then(|p| p.value_as_f64())
                    .or_else(|| {
                        hit.cv_params
                            .iter()
                            .find(|t| t.name.to_lowercase().ends_with(&suffix))
                            .and_then(|t| t.value_as_f64())
                    })
            }
        }
    }
}

/// Which values a threshold prefers when ordering candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preference {
    Larger,
    Smaller,
    NearCenter,
    FarFromCenter,
}

/// Score bounds with optional step-wise relaxation
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreThreshold {
    selector: ScoreSelector,
    min: f64,
    max: f64,
    step: f64,
    max_steps: u32,
    step_count: u32,
}

impl ScoreThreshold {
    /// Build a threshold from bounds; an infinite bound is open
    pub fn new(selector: ScoreSelector, range: ScoreRange, step: f64, max_steps: u32) -> Self {
        Self {
            selector,
            min: range.min,
            max: range.max,
            step,
            max_steps,
            step_count: 0,
        }
    }

    /// Build a threshold from a range expression
    pub fn from_expression(
        selector: ScoreSelector,
        expression: &str,
        step: f64,
        max_steps: u32,
    ) -> Result<Self, RangeSyntaxError> {
        Ok(Self::new(selector, parse_range(expression)?, step, max_steps))
    }

    /// Build a threshold from explicit bounds; an unused bound is open
    pub fn from_bounds(
        selector: ScoreSelector,
        min: f64,
        max: f64,
        use_min: bool,
        use_max: bool,
        step: f64,
        max_steps: u32,
    ) -> Self {
        let range = ScoreRange {
            min: if use_min { min } else { f64::NEG_INFINITY },
            max: if use_max { max } else { f64::INFINITY },
        };
        Self::new(selector, range, step, max_steps)
    }

    /// Score selector
    pub fn selector(&self) -> &ScoreSelector {
        &self.selector
    }

    /// Score name used in logs and provenance
    pub fn score_name(&self) -> &str {
        self.selector.name()
    }

    /// Lower bound
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Relaxation steps applied so far
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Whether values must fall inside `[min, max]` rather than outside it
    pub fn is_inside_range(&self) -> bool {
        self.min < self.max
    }

    fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    fn preference(&self) -> Preference {
        match (self.min.is_finite(), self.max.is_finite()) {
            (true, false) => Preference::Larger,
            (false, true) => Preference::Smaller,
            _ if self.is_inside_range() => Preference::NearCenter,
            _ => Preference::FarFromCenter,
        }
    }

    /// Whether a score value satisfies the bounds
    pub fn accepts(&self, value: f64) -> bool {
        if self.is_inside_range() {
            self.min <= value && value <= self.max
        } else {
            value <= self.max || value >= self.min
        }
    }

    /// Evaluate a hit: whether it passes, and its score if one was found
    pub fn passes_filter(&self, hit: &IdentificationHit) -> (bool, Option<f64>) {
        match self.selector.score_of(hit) {
            Some(value) => (self.accepts(value), Some(value)),
            None => (false, None),
        }
    }

    /// Whether score `left` is better than score `right`
    pub fn is_better(&self, left: f64, right: f64) -> bool {
        match self.preference() {
            Preference::Larger => left > right,
            Preference::Smaller => left < right,
            Preference::NearCenter => (left - self.center()).abs() < (right - self.center()).abs(),
            Preference::FarFromCenter => {
                (left - self.center()).abs() > (right - self.center()).abs()
            }
        }
    }

    /// Whether identification `left` is better than `right`.
    ///
    /// Distinct non-zero ranks decide first (lower wins), then the score.
    pub fn is_better_identification(&self, left: &Identification, right: &Identification) -> bool {
        if left.rank != 0 && right.rank != 0 && left.rank != right.rank {
            return left.rank < right.rank;
        }
        self.is_better(left.score_value, right.score_value)
    }

    /// Ordering for sorting identifications best-first
    pub fn compare_identifications(&self, left: &Identification, right: &Identification) -> Ordering {
        if self.is_better_identification(left, right) {
            Ordering::Less
        } else if self.is_better_identification(right, left) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// The next relaxation step, or `None` once the step budget is spent.
    ///
    /// Finite bounds are multiplied by the step; open bounds stay open.
    pub fn relaxed(&self) -> Option<Self> {
        if self.step == 0.0 || self.step_count >= self.max_steps {
            return None;
        }
        let scale = |v: f64| if v.is_finite() { v * self.step } else { v };
        let next = Self {
            min: scale(self.min),
            max: scale(self.max),
            step_count: self.step_count + 1,
            ..self.clone()
        };
        info!("Adjusted filter: {} -> {}", self, next);
        Some(next)
    }

    /// Human-readable threshold: `>= x`, `<= x`, or the full range
    pub fn description(&self) -> String {
        match (self.min.is_finite(), self.max.is_finite()) {
            (true, false) => format!(">= {}", self.min),
            (false, true) => format!("<= {}", self.max),
            _ if self.is_inside_range() => format!("{} <= value <= {}", self.min, self.max),
            _ => format!("value <= {} || value >= {}", self.max, self.min),
        }
    }
}

impl fmt::Display for ScoreThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = if self.is_inside_range() { "&&" } else { "||" };
        write!(
            f,
            "{}; {} <= value {} value <= {}",
            self.score_name(),
            self.min,
            join,
            self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlled_vocabulary::{CvParamList, CvTerm, UserParam};
    use crate::identification::scores::software;

    fn hit_with_cv(accession: &str, name: &str, value: f64) -> IdentificationHit {
        IdentificationHit {
            cv_params: CvParamList::new().with(CvTerm::new(accession, name).with_value(value)),
            ..Default::default()
        }
    }

    fn ident(rank: u32, score_value: f64) -> Identification {
        Identification {
            scan_id: 1,
            native_id: "scan=1".to_string(),
            rank,
            peptide: String::new(),
            peptide_length: 0,
            ms_level: None,
            high_res: false,
            score_value,
            charge: 2,
        }
    }

    #[test]
    fn test_cv_lookup_after_translation() {
        let selector = ScoreSelector::resolve(Some(software::MS_GF_PLUS), "SpecEValue");
        let threshold = ScoreThreshold::from_expression(selector, "-1e-10", 0.0, 0).unwrap();
        assert_eq!(threshold.score_name(), "MS-GF:SpecEValue");

        let good = hit_with_cv("MS:1002052", "MS-GF:SpecEValue", 1e-12);
        let poor = hit_with_cv("MS:1002052", "MS-GF:SpecEValue", 1e-5);
        let other = hit_with_cv("MS:1002053", "MS-GF:EValue", 1e-12);
        assert_eq!(threshold.passes_filter(&good), (true, Some(1e-12)));
        assert_eq!(threshold.passes_filter(&poor), (false, Some(1e-5)));
        assert_eq!(threshold.passes_filter(&other), (false, None));
    }

    #[test]
    fn test_suffix_lookup_prefers_user_params() {
        let selector = ScoreSelector::resolve(None, "percolator:Q");
        assert!(matches!(selector, ScoreSelector::Name(_)));

        let hit = IdentificationHit {
            cv_params: CvParamList::new().with(CvTerm::new("MS:0000000", "other percolator:q").with_value(0.5)),
            user_params: vec![UserParam::new("Percolator:Q", 0.001)],
            ..Default::default()
        };
        let threshold = ScoreThreshold::from_expression(selector, "-0.01", 0.0, 0).unwrap();
        assert_eq!(threshold.passes_filter(&hit), (true, Some(0.001)));
    }

    #[test]
    fn test_outside_range() {
        let selector = ScoreSelector::Name("delta".to_string());
        let threshold = ScoreThreshold::from_expression(selector, "[5,-5]", 0.0, 0).unwrap();
        assert!(!threshold.is_inside_range());
        assert!(threshold.accepts(6.0));
        assert!(threshold.accepts(-7.0));
        assert!(!threshold.accepts(0.0));
        assert!(threshold.is_better(-9.0, 6.0));
        assert_eq!(threshold.description(), "value <= -5 || value >= 5");
    }

    #[test]
    fn test_inside_range_prefers_center() {
        let selector = ScoreSelector::Name("delta".to_string());
        let threshold = ScoreThreshold::from_expression(selector, "[-5,5]", 0.0, 0).unwrap();
        assert!(threshold.is_better(0.5, -2.0));
        assert!(!threshold.is_better(4.0, 1.0));
        assert_eq!(threshold.description(), "-5 <= value <= 5");
    }

    #[test]
    fn test_one_sided_ordering() {
        let upper = ScoreThreshold::from_bounds(ScoreSelector::Name("q".into()), 0.0, 0.01, false, true, 0.0, 0);
        assert!(upper.is_better(0.001, 0.005));
        assert_eq!(upper.description(), "<= 0.01");

        let lower = ScoreThreshold::from_bounds(ScoreSelector::Name("xcorr".into()), 2.5, 0.0, true, false, 0.0, 0);
        assert!(lower.is_better(4.0, 3.0));
        assert_eq!(lower.description(), ">= 2.5");
    }

    #[test]
    fn test_rank_precedes_score() {
        let threshold = ScoreThreshold::from_expression(ScoreSelector::Name("q".into()), "-0.01", 0.0, 0).unwrap();
        assert!(threshold.is_better_identification(&ident(1, 0.009), &ident(2, 0.0001)));
        assert!(threshold.is_better_identification(&ident(0, 0.0001), &ident(2, 0.009)));
        assert!(threshold.is_better_identification(&ident(1, 0.0001), &ident(1, 0.009)));
        assert_eq!(
            threshold.compare_identifications(&ident(3, 0.1), &ident(3, 0.1)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_relaxation_budget() {
        let threshold = ScoreThreshold::from_expression(ScoreSelector::Name("q".into()), "-1e-10", 10.0, 2).unwrap();
        let first = threshold.relaxed().unwrap();
        assert!((first.max() - 1e-9).abs() < 1e-20);
        assert_eq!(first.min(), f64::NEG_INFINITY);
        let second = first.relaxed().unwrap();
        assert_eq!(second.step_count(), 2);
        assert!(second.relaxed().is_none());

        let fixed = ScoreThreshold::from_expression(ScoreSelector::Name("q".into()), "-1e-10", 0.0, 5).unwrap();
        assert!(fixed.relaxed().is_none());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn relaxation_scales_monotonically(max in 1e-12f64..1.0, step in 1.1f64..20.0, steps in 1u32..8) {
                let mut threshold = ScoreThreshold::from_expression(
                    ScoreSelector::Name("q".into()), &format!("-{}", max), step, steps,
                ).unwrap();
                let mut applied = 0;
                while let Some(next) = threshold.relaxed() {
                    prop_assert!(next.max() > threshold.max());
                    threshold = next;
                    applied += 1;
                }
                prop_assert_eq!(applied, steps);
                prop_assert_eq!(threshold.step_count(), steps);
            }
        }
    }
}
