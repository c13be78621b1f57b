//! Values with SI prefixes.

use crate::amount::MAX_DECIMALS;
use crate::error::{FormatError, Result};

/// Supported prefixes by decimal exponent.
const PREFIXES: [(i32, &str); 9] = [
    (-12, "p"),
    (-9, "n"),
    (-6, "µ"),
    (-3, "m"),
    (0, ""),
    (3, "k"),
    (6, "M"),
    (9, "G"),
    (12, "T"),
];

const MIN_EXPONENT: i32 = -12;
const MAX_EXPONENT: i32 = 12;

/// Formats `1500 g` as `1.5 kg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiFormatter;

impl SiFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Decimal exponent of the most significant digit. Zero for zero.
    pub fn magnitude(value: f64) -> i32 {
        if value == 0.0 || !value.is_finite() {
            return 0;
        }
        value.abs().log10().floor() as i32
    }

    /// Divisor and symbol for a magnitude, clamped to `p` ..= `T`.
    pub fn prefix_for_magnitude(magnitude: i32) -> (f64, &'static str) {
        let exponent = (magnitude.div_euclid(3) * 3).clamp(MIN_EXPONENT, MAX_EXPONENT);
        let symbol = PREFIXES
            .iter()
            .find(|(e, _)| *e == exponent)
            .map(|(_, s)| *s)
            .unwrap_or("");
        (10f64.powi(exponent), symbol)
    }

    /// Format `value` with the prefix matching its magnitude.
    ///
    /// The prefix is chosen after rounding, so `999.999 g` at two decimals
    /// is `1 kg`. Trailing zeroes are dropped unless `show_all_digits` is set.
    pub fn format(&self, value: f64, unit: &str, decimals: usize, show_all_digits: bool) -> Result<String> {
        if decimals > MAX_DECIMALS {
            return Err(FormatError::InvalidOption(format!(
                "decimals must be at most {}, got {}",
                MAX_DECIMALS, decimals
            )));
        }
        if !value.is_finite() {
            return Err(FormatError::InvalidOption(format!(
                "value must be finite, got {}",
                value
            )));
        }

        let magnitude = Self::magnitude(value);
        let (mut divisor, mut symbol) = Self::prefix_for_magnitude(magnitude);
        if rounded(value / divisor, decimals).abs() >= 1000.0 {
            (divisor, symbol) = Self::prefix_for_magnitude(magnitude + 3);
        }

        let min = if show_all_digits { decimals } else { 0 };
        let number = decimal(value / divisor, decimals, min);
        Ok(if unit.is_empty() && symbol.is_empty() {
            number
        } else {
            format!("{} {}{}", number, symbol, unit)
        })
    }
}

/// `value` as it prints with `decimals` digits.
fn rounded(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// `value` rounded to `max` decimals, trailing zeroes trimmed down to `min`.
pub(crate) fn decimal(value: f64, max: usize, min: usize) -> String {
    let mut out = format!("{:.*}", max, value);
    if max > min && value.is_finite() {
        let keep = out.len().saturating_sub(max - min);
        while out.len() > keep && out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_selection() {
        let f = SiFormatter::new();
        assert_eq!(f.format(1500.0, "g", 2, false).unwrap(), "1.5 kg");
        assert_eq!(f.format(0.0022, "F", 2, false).unwrap(), "2.2 mF");
        assert_eq!(f.format(4.7e-6, "F", 2, false).unwrap(), "4.7 µF");
        assert_eq!(f.format(2.2e-9, "F", 2, false).unwrap(), "2.2 nF");
        assert_eq!(f.format(330.0, "Ω", 2, false).unwrap(), "330 Ω");
        assert_eq!(f.format(-2500.0, "V", 2, false).unwrap(), "-2.5 kV");
    }

    #[test]
    fn test_out_of_range_clamps() {
        let f = SiFormatter::new();
        assert_eq!(f.format(5e15, "B", 2, false).unwrap(), "5000 TB");
        assert_eq!(f.format(0.0, "V", 2, false).unwrap(), "0 V");
    }

    #[test]
    fn test_show_all_digits() {
        let f = SiFormatter::new();
        assert_eq!(f.format(1500.0, "g", 2, true).unwrap(), "1.50 kg");
        assert_eq!(f.format(12.5, "", 3, true).unwrap(), "12.500");
        assert_eq!(f.format(12.5, "", 3, false).unwrap(), "12.5");
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(SiFormatter::magnitude(1.0), 0);
        assert_eq!(SiFormatter::magnitude(999.0), 2);
        assert_eq!(SiFormatter::magnitude(0.01), -2);
        assert_eq!(SiFormatter::prefix_for_magnitude(-2), (10f64.powi(-3), "m"));
    }

    #[test]
    fn test_decimal_trimming() {
        assert_eq!(decimal(1.5, 5, 2), "1.50");
        assert_eq!(decimal(1.23456, 5, 2), "1.23456");
        assert_eq!(decimal(3.0, 2, 0), "3");
        assert_eq!(decimal(3.0, 0, 0), "3");
    }

    #[test]
    fn test_rounding_moves_to_next_prefix() {
        let f = SiFormatter::new();
        assert_eq!(f.format(999.999, "g", 2, false).unwrap(), "1 kg");
        assert_eq!(f.format(-999_999.9, "V", 0, false).unwrap(), "-1 MV");
        assert_eq!(f.format(0.999999, "F", 2, true).unwrap(), "1.00 F");
        assert_eq!(f.format(999.994, "g", 2, false).unwrap(), "999.99 g");
        assert_eq!(f.format(9.999e15, "B", 0, false).unwrap(), "9999 TB");
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let f = SiFormatter::new();
        for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = f.format(value, "V", 5, false).unwrap_err();
            assert!(matches!(err, FormatError::InvalidOption(_)));
        }
        assert!(matches!(
            f.format(1.0, "V", MAX_DECIMALS + 1, false),
            Err(FormatError::InvalidOption(_))
        ));
        assert_eq!(decimal(f64::INFINITY, 5, 0), "inf");
        assert_eq!(decimal(f64::NAN, 5, 2), "NaN");
    }
}
