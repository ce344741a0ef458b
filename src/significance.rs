//! Display rounding of a value by its uncertainty.
//!
//! The uncertainty is quoted with one or two significant figures and the value is rounded to the
//! same decimal position. The uncertainty is first rounded to two significant figures; when that
//! figure, rounded again to one significant figure, leads with a digit of 3 or more a single
//! figure is kept, otherwise two. The decimal count then follows from the decade of the
//! uncertainty alone, `decimals = figures - 1 - floor(log10(u))`, so it never increases as the
//! uncertainty grows.
//!
//! Rounding here is for display only. Nothing upstream ever sees the rounded numbers.
use std::fmt;

use tracing::warn;

/// Decimal places used when the uncertainty is zero and carries no information about precision
pub const DEFAULT_DECIMALS: i32 = 3;

/// A value and uncertainty rounded for reporting
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rounded {
    pub(crate) value: f64,
    pub(crate) uncertainty: f64,
    pub(crate) decimals: i32,
    pub(crate) degenerate: bool,
}

impl Rounded {
    pub const fn value(&self) -> f64 {
        self.value
    }

    pub const fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    /// Number of decimal places. Negative values round to tens, hundreds and so on.
    pub const fn decimals(&self) -> i32 {
        self.decimals
    }

    /// Whether the uncertainty was zero, subnormal or not finite and [`DEFAULT_DECIMALS`] was used
    pub const fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Digits to print after the decimal point
    pub fn precision(&self) -> usize {
        usize::try_from(self.decimals).unwrap_or(0)
    }
}

impl fmt::Display for Rounded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.precision();
        write!(
            f,
            "{:.precision$} ± {:.precision$}",
            self.value, self.uncertainty
        )
    }
}

/// Round `value` and `uncertainty` for reporting
///
/// A zero, subnormal or non-finite uncertainty cannot set a precision. The value is then rounded to
/// [`DEFAULT_DECIMALS`] places and the result is flagged degenerate rather than failing. The sign
/// of `uncertainty` is ignored.
///
/// Formatting the output again returns it unchanged.
///
/// # Examples
///
/// ```
/// use lab_uncertainty::significance::format_with_uncertainty;
///
/// let rounded = format_with_uncertainty(2.0312, 0.0283);
/// assert_eq!(rounded.decimals(), 2);
/// assert_eq!(rounded.value(), 2.03);
/// assert_eq!(rounded.uncertainty(), 0.03);
///
/// let rounded = format_with_uncertainty(9.81234, 0.0123);
/// assert_eq!(rounded.decimals(), 3);
/// assert_eq!(rounded.to_string(), "9.812 ± 0.012");
/// ```
pub fn format_with_uncertainty(value: f64, uncertainty: f64) -> Rounded {
    let magnitude = uncertainty.abs();
    if !magnitude.is_normal() {
        warn!(uncertainty, "uncertainty carries no precision, using default decimals");
        return Rounded {
            value: round_to(value, DEFAULT_DECIMALS),
            uncertainty: if magnitude.is_finite() { magnitude } else { 0.0 },
            decimals: DEFAULT_DECIMALS,
            degenerate: true,
        };
    }

    let (digits, decimals) = leading_digits(magnitude);

    Rounded {
        value: round_to(value, decimals),
        uncertainty: scale(digits, decimals),
        decimals,
        degenerate: false,
    }
}

/// Significant digits of `uncertainty` as an integer, and the decimal position of the last one
fn leading_digits(uncertainty: f64) -> (f64, i32) {
    let (mut mantissa, mut exponent) = decompose(uncertainty);

    // Two significant figures, as an integer in 10..=99
    let mut two_figures = (mantissa * 10.0).round();
    if two_figures >= 100.0 {
        exponent += 1;
        mantissa /= 10.0;
        two_figures = (mantissa * 10.0).round();
    }

    // Integers up to 99 divide by ten exactly at the half, so this rounds half away from zero
    let one_figure = (two_figures / 10.0).round();
    if one_figure >= 3.0 {
        (one_figure, -exponent)
    } else {
        (two_figures, 1 - exponent)
    }
}

/// Split a positive, finite `x` into a mantissa in `[1, 10)` and a decimal exponent
fn decompose(x: f64) -> (f64, i32) {
    // `log10` of an exact power of ten can land a hair on either side of the integer, the checks
    // below move it back into range
    #[allow(clippy::cast_possible_truncation)]
    let mut exponent = x.log10().floor() as i32;
    let mut mantissa = scale(x, exponent);
    if mantissa >= 10.0 {
        exponent += 1;
        mantissa = scale(x, exponent);
    } else if mantissa < 1.0 {
        exponent -= 1;
        mantissa = scale(x, exponent);
    }
    (mantissa, exponent)
}

/// `x / 10^decimals`, dividing or multiplying by an exact power of ten
///
/// Powers beyond the range of `f64` are applied in two steps.
fn scale(x: f64, decimals: i32) -> f64 {
    if decimals.abs() > f64::MAX_10_EXP {
        let half = decimals / 2;
        return scale(scale(x, half), decimals - half);
    }
    if decimals >= 0 {
        x / 10f64.powi(decimals)
    } else {
        x * 10f64.powi(-decimals)
    }
}

/// Round `x` to `decimals` places, where negative `decimals` round to tens, hundreds, ...
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let shifted = scale(x, -decimals);
    if !shifted.is_finite() {
        return x;
    }
    scale(shifted.round(), decimals)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{format_with_uncertainty, round_to, DEFAULT_DECIMALS};

    #[test]
    fn uncertainty_leading_with_three_or_more_keeps_one_figure() {
        let rounded = format_with_uncertainty(2.0312, 0.0283);

        assert_eq!(rounded.decimals(), 2);
        assert_eq!(rounded.value(), 2.03);
        assert_eq!(rounded.uncertainty(), 0.03);
        assert!(!rounded.is_degenerate());
        assert_eq!(rounded.to_string(), "2.03 ± 0.03");
    }

    #[test]
    fn uncertainty_leading_with_one_or_two_keeps_two_figures() {
        let rounded = format_with_uncertainty(1.0199, 0.0143);
        assert_eq!(rounded.decimals(), 3);
        assert_eq!(rounded.value(), 1.020);
        assert_eq!(rounded.uncertainty(), 0.014);

        let rounded = format_with_uncertainty(0.1234, 0.00234);
        assert_eq!(rounded.decimals(), 4);
        assert_eq!(rounded.uncertainty(), 0.0023);
    }

    #[test]
    fn carry_into_the_next_decade_is_reported_at_the_new_decade() {
        let rounded = format_with_uncertainty(5.2714, 0.0996);
        assert_eq!(rounded.decimals(), 2);
        assert_eq!(rounded.value(), 5.27);
        assert_eq!(rounded.uncertainty(), 0.1);
        assert_eq!(rounded.to_string(), "5.27 ± 0.10");
    }

    #[test]
    fn large_uncertainties_round_to_tens_and_hundreds() {
        let rounded = format_with_uncertainty(1234.5, 283.0);
        assert_eq!(rounded.decimals(), -2);
        assert_eq!(rounded.value(), 1200.0);
        assert_eq!(rounded.uncertainty(), 300.0);
        assert_eq!(rounded.to_string(), "1200 ± 300");

        let rounded = format_with_uncertainty(7512.3, 15.3);
        assert_eq!(rounded.decimals(), 0);
        assert_eq!(rounded.value(), 7512.0);
        assert_eq!(rounded.uncertainty(), 15.0);
    }

    #[test]
    fn zero_uncertainty_falls_back_to_default_precision() {
        let rounded = format_with_uncertainty(2.718_281_8, 0.0);

        assert!(rounded.is_degenerate());
        assert_eq!(rounded.decimals(), DEFAULT_DECIMALS);
        assert_eq!(rounded.value(), 2.718);
        assert_eq!(rounded.uncertainty(), 0.0);
    }

    #[test]
    fn uncertainties_at_the_edge_of_the_float_range_stay_finite() {
        let rounded = format_with_uncertainty(1.0, 1e-310);
        assert!(rounded.is_degenerate());
        assert_eq!(rounded.decimals(), DEFAULT_DECIMALS);
        assert!(rounded.uncertainty().is_finite());

        let rounded = format_with_uncertainty(1.0, 1.5e-308);
        assert!(!rounded.is_degenerate());
        assert_eq!(rounded.decimals(), 309);
        assert!(rounded.uncertainty().is_finite());
        approx::assert_relative_eq!(rounded.uncertainty(), 1.5e-308, max_relative = 1e-12);
        assert_eq!(rounded.value(), 1.0);
    }

    #[test]
    fn decimals_never_increase_with_the_uncertainty() {
        let mut previous = i32::MAX;
        let mut uncertainty = 1e-6;
        while uncertainty < 1e6 {
            let decimals = format_with_uncertainty(1.0, uncertainty).decimals();
            assert!(decimals <= previous, "decimals increased at {uncertainty}");
            previous = decimals;
            uncertainty *= 1.013;
        }
    }

    #[test]
    fn values_round_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(1250.0, -2), 1300.0);
    }

    proptest! {
        #[test]
        fn formatting_is_idempotent(value in -1e4..1e4f64, uncertainty in 1e-6..1e4f64) {
            let once = format_with_uncertainty(value, uncertainty);
            let twice = format_with_uncertainty(once.value(), once.uncertainty());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn rounded_uncertainty_has_one_or_two_significant_figures(uncertainty in 1e-6..1e4f64) {
            let rounded = format_with_uncertainty(0.0, uncertainty);
            let digits = rounded.uncertainty() * 10f64.powi(rounded.decimals());
            // A lone figure is 3-9 (or 10 after a carry), a pair is 10-24
            prop_assert!((3.0..25.0).contains(&digits.round()));
        }
    }
}
