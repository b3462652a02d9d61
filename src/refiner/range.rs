//! Threshold range expressions
//!
//! Two forms are accepted:
//!
//! - Bracketed: `[200,]`, `[,-200]`, `[-5,5]`, `[5,-5]`. An empty side is
//!   unbounded; `min > max` selects values outside the range. The brackets
//!   may be omitted when a comma is present (`1,5`).
//! - Dashed: `-1e-10` (at most 1e-10), `--1e-10` (at most -1e-10), `5-`
//!   (at least 5), `1-5` (between 1 and 5). A dash directly after an exponent
//!   marker belongs to the number.

use std::fmt;

/// Malformed range expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid range \"{text}\": {reason}")]
pub struct RangeSyntaxError {
    /// The expression as given
    pub text: String,
    /// What is wrong with it
    pub reason: String,
}

impl RangeSyntaxError {
    fn new(text: &str, reason: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parsed bounds; an unbounded side is infinite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl ScoreRange {
    /// Bounds with no restriction on either side
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

impl fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: f64| if v.is_finite() { v.to_string() } else { String::new() };
        write!(f, "[{},{}]", side(self.min), side(self.max))
    }
}

/// Parse a range expression
pub fn parse_range(expr: &str) -> Result<ScoreRange, RangeSyntaxError> {
    let text = expr.trim();
    if text.is_empty() {
        return Err(RangeSyntaxError::new(expr, "empty expression"));
    }

    if let Some(rest) = text.strip_prefix('[') {
        let inner = rest
            .strip_suffix(']')
            .ok_or_else(|| RangeSyntaxError::new(expr, "missing closing bracket"))?;
        parse_bracketed(expr, inner)
    } else if text.contains(',') {
        parse_bracketed(expr, text)
    } else {
        parse_dashed(expr, text)
    }
}

fn parse_number(expr: &str, number: &str) -> Result<f64, RangeSyntaxError> {
    number
        .trim()
        .parse::<f64>()
        .map_err(|_| RangeSyntaxError::new(expr, format!("\"{}\" is not a number", number)))
}

fn parse_bracketed(expr: &str, inner: &str) -> Result<ScoreRange, RangeSyntaxError> {
    let mut range = ScoreRange::unbounded();
    let (lower, upper) = match inner.rfind(',') {
        Some(comma) => (&inner[..comma], Some(&inner[comma + 1..])),
        None => (inner, None),
    };

    if !lower.trim().is_empty() {
        range.min = parse_number(expr, lower)?;
    }
    if let Some(upper) = upper.filter(|u| !u.trim().is_empty()) {
        range.max = parse_number(expr, upper)?;
    }
    Ok(range)
}

fn parse_dashed(expr: &str, text: &str) -> Result<ScoreRange, RangeSyntaxError> {
    let chars: Vec<char> = text.chars().collect();
    let last = chars.len() - 1;

    let mut numbers: Vec<String> = Vec::with_capacity(2);
    let mut current = String::new();
    let mut start_minus = false;
    let mut end_minus = false;
    let mut separated = false;

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E') {
            current.push(c);
        } else if c != '-' {
            return Err(RangeSyntaxError::new(expr, format!("invalid character '{}'", c)));
        } else if i > 0 && matches!(chars[i - 1], 'e' | 'E') {
            // exponent sign
            current.push(c);
        } else if i == 0 {
            start_minus = true;
        } else if i == 1 && start_minus {
            // "--x": upper bound is negative
            current.push(c);
        } else if i == last {
            if separated {
                return Err(RangeSyntaxError::new(
                    expr,
                    "both bounds given together with an open end",
                ));
            }
            end_minus = true;
            if start_minus {
                start_minus = false;
                current.insert(0, '-');
            }
        } else if !separated {
            separated = true;
            if start_minus && !current.starts_with('-') {
                current.insert(0, '-');
                start_minus = false;
            }
            numbers.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    numbers.push(current);

    if (start_minus && end_minus) || ((start_minus || end_minus) && separated) {
        return Err(RangeSyntaxError::new(
            expr,
            "range opens in both directions from a value",
        ));
    }

    let values = numbers
        .iter()
        .map(|n| parse_number(expr, n))
        .collect::<Result<Vec<f64>, _>>()?;

    let mut range = ScoreRange::unbounded();
    if start_minus {
        range.max = values[0];
    } else if end_minus {
        range.min = values[0];
    } else if let &[min, max] = values.as_slice() {
        range.min = min;
        range.max = max;
    } else {
        return Err(RangeSyntaxError::new(
            expr,
            "a single value needs a leading or trailing '-'",
        ));
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: f64, max: f64) -> ScoreRange {
        ScoreRange { min, max }
    }

    #[test]
    fn test_dashed_forms() {
        assert_eq!(parse_range("-1e-10").unwrap(), range(f64::NEG_INFINITY, 1e-10));
        assert_eq!(parse_range("--1.0e-10").unwrap(), range(f64::NEG_INFINITY, -1e-10));
        assert_eq!(parse_range("5-").unwrap(), range(5.0, f64::INFINITY));
        assert_eq!(parse_range("5.0-").unwrap(), range(5.0, f64::INFINITY));
        assert_eq!(parse_range("1-5").unwrap(), range(1.0, 5.0));
        assert_eq!(parse_range("1e-3-2E-2").unwrap(), range(1e-3, 2e-2));
        assert_eq!(parse_range("-1-5").unwrap(), range(-1.0, 5.0));
        assert_eq!(parse_range("-5-").unwrap(), range(-5.0, f64::INFINITY));
        assert_eq!(parse_range("1--5").unwrap(), range(1.0, -5.0));
    }

    #[test]
    fn test_bracketed_forms() {
        assert_eq!(parse_range("[200,]").unwrap(), range(200.0, f64::INFINITY));
        assert_eq!(parse_range("[,-200]").unwrap(), range(f64::NEG_INFINITY, -200.0));
        assert_eq!(parse_range("[-5,5]").unwrap(), range(-5.0, 5.0));
        assert_eq!(parse_range("[5,-5]").unwrap(), range(5.0, -5.0));
        assert_eq!(parse_range("1,5").unwrap(), range(1.0, 5.0));
        assert_eq!(parse_range(" [1e-3, 0.5] ").unwrap(), range(1e-3, 0.5));
    }

    #[test]
    fn test_rejected_forms() {
        for bad in ["", "abc", "1-5-", "-1-5-", "5", "1.2.3-", "[1,5", "[x,]", "1 - 5", "--"] {
            assert!(parse_range(bad).is_err(), "expected error for {:?}", bad);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(parse_range("5-").unwrap().to_string(), "[5,]");
        assert_eq!(parse_range("1-5").unwrap().to_string(), "[1,5]");
    }
}
