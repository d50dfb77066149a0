//! Formula ranges
//!
//! Computes the displayed min/max of a signal from its bit length and its
//! linear formula, and the human-readable formula text.

use crate::types::{Formula, Signal};
use std::fmt;

/// Decimal places kept for display
pub const DISPLAY_DECIMALS: i32 = 6;

/// Displayed value range of a signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    /// Value at raw 0
    pub min: f64,
    /// Value at raw `2^len - 1`
    pub max: f64,
}

impl ValueRange {
    pub fn display_min(&self) -> f64 {
        round_for_display(self.min)
    }

    pub fn display_max(&self) -> f64 {
        round_for_display(self.max)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            format_number(self.min),
            format_number(self.max)
        )
    }
}

/// Range of a signal, `None` without a declared length or with `div == 0`
pub fn compute_range(signal: &Signal) -> Option<ValueRange> {
    range_for(signal.declared_length?, &signal.formula)
}

/// Range for an explicit bit length
pub fn range_for(bit_length: usize, formula: &Formula) -> Option<ValueRange> {
    if formula.div == 0.0 {
        return None;
    }

    // f64 keeps lengths of 64 bits and beyond representable
    let max_raw = 2f64.powi(i32::try_from(bit_length).ok()?) - 1.0;
    Some(ValueRange {
        min: formula.apply(0.0),
        max: formula.apply(max_raw),
    })
}

/// Formula text with default terms omitted, `None` for the identity formula
///
/// `mul = 0.1, div = 1, add = -40` reads `x * 0.1 - 40`.
pub fn describe(formula: &Formula) -> Option<String> {
    if formula.is_identity() {
        return None;
    }

    let mut text = String::from("x");
    if formula.mul != 1.0 {
        text.push_str(&format!(" * {}", format_number(formula.mul)));
    }
    if formula.div != 1.0 {
        text.push_str(&format!(" / {}", format_number(formula.div)));
    }
    if formula.add != 0.0 {
        if formula.add < 0.0 {
            text.push_str(&format!(" - {}", format_number(-formula.add)));
        } else {
            text.push_str(&format!(" + {}", format_number(formula.add)));
        }
    }

    Some(text)
}

/// Round to [`DISPLAY_DECIMALS`] places, folding `-0` into `0`
pub fn round_for_display(value: f64) -> f64 {
    let scale = 10f64.powi(DISPLAY_DECIMALS);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Shortest decimal form of a display-rounded value
pub fn format_number(value: f64) -> String {
    if value.is_finite() {
        round_for_display(value).to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(length: usize, formula: Formula) -> Signal {
        Signal::new("s", "S", 0, length).with_formula(formula)
    }

    #[test]
    fn test_default_formula_byte_range() {
        let range = compute_range(&signal(8, Formula::default())).unwrap();
        assert_eq!(range.min, 0.0);
        assert_eq!(range.max, 255.0);
        assert_eq!(range.to_string(), "0 to 255");
    }

    #[test]
    fn test_scaled_negative_offset() {
        let range = compute_range(&signal(4, Formula::new(0.1, 1.0, -5.0))).unwrap();
        assert_eq!(range.display_min(), -5.0);
        assert_eq!(range.display_max(), -3.5);
        assert_eq!(range.to_string(), "-5 to -3.5");
    }

    #[test]
    fn test_missing_length_has_no_range() {
        let mut s = signal(8, Formula::default());
        s.declared_length = None;
        assert_eq!(compute_range(&s), None);
    }

    #[test]
    fn test_zero_divisor_has_no_range() {
        assert_eq!(compute_range(&signal(8, Formula::new(1.0, 0.0, 0.0))), None);
    }

    #[test]
    fn test_wide_signal_range() {
        let range = range_for(64, &Formula::default()).unwrap();
        assert_eq!(range.max, 18446744073709551615.0);
    }

    #[test]
    fn test_describe_omits_default_terms() {
        assert_eq!(describe(&Formula::default()), None);
        assert_eq!(describe(&Formula::new(0.1, 1.0, 0.0)).as_deref(), Some("x * 0.1"));
        assert_eq!(describe(&Formula::new(1.0, 4.0, 0.0)).as_deref(), Some("x / 4"));
        assert_eq!(describe(&Formula::new(1.0, 1.0, -40.0)).as_deref(), Some("x - 40"));
        assert_eq!(
            describe(&Formula::new(100.0, 255.0, 2.5)).as_deref(),
            Some("x * 100 / 255 + 2.5")
        );
    }

    #[test]
    fn test_display_rounding() {
        assert_eq!(format_number(100.0 / 3.0), "33.333333");
        assert_eq!(format_number(-0.0000001), "0");
        assert_eq!(format_number(1.5000000000000002), "1.5");
    }
}
