//! Step (tick/lot size) and precision snapping for decimal inputs.
//!
//! The `Decimal` functions use `rust_decimal` and are limited to its 96-bit
//! mantissa (28 significant digits). [`snap_text_to_step`] works on 256-bit
//! integer units instead and is exact for anything a user can type. Every
//! function here is total: bad parameters degrade to a well-defined fallback
//! instead of failing.

use alloy_primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::shared::amount::{scale_digits, split_decimal};

/// Largest scale `rust_decimal` can represent; `decimals` is clamped to it.
pub const MAX_DECIMALS: u32 = 28;

/// Truncate the fractional part of `text` to at most `decimals` digits.
///
/// Used while a field is being edited: the integer part and the decimal
/// point are left untouched, so `"12."` stays `"12."` and `"12.999"` with two
/// decimals becomes `"12.99"`. Never rounds.
pub fn limit_fraction_digits(text: &str, decimals: u32) -> String {
    match text.split_once('.') {
        Some((int, frac)) => {
            let keep = frac
                .char_indices()
                .nth(decimals as usize)
                .map(|(idx, _)| idx)
                .unwrap_or(frac.len());
            format!("{}.{}", int, &frac[..keep])
        }
        None => text.to_string(),
    }
}

/// Round `value` half-away-from-zero to `decimals` digits and render it with
/// exactly that many fractional digits (`1.5` at 2 → `1.50`).
///
/// When the integer part and `decimals` together need more than 28 digits,
/// the result keeps as many fractional digits as fit.
pub fn snap_to_decimals(value: Decimal, decimals: u32) -> Decimal {
    let decimals = decimals.min(MAX_DECIMALS);
    let mut rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimals);
    rounded
}

/// Round `value` to the nearest multiple of `step`, rendered at `decimals`.
///
/// The quotient `value / step` is rounded half-away-from-zero. A
/// non-positive step, or a quotient that overflows, falls back to
/// [`snap_to_decimals`]. The caller must pick `decimals` large enough to
/// express `step` exactly. Subject to the 28-digit limit above; use
/// [`snap_text_to_step`] for user input.
///
/// ```text
/// snap_to_step(10.37, 0.5, 2)  = 10.50
/// snap_to_step(12.999, 0.01, 2) = 13.00
/// ```
pub fn snap_to_step(value: Decimal, step: Decimal, decimals: u32) -> Decimal {
    if step <= Decimal::ZERO {
        tracing::debug!("Non-positive step {}, snapping to decimals only", step);
        return snap_to_decimals(value, decimals);
    }

    let snapped = value
        .checked_div(step)
        .map(|q| q.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|q| q.checked_mul(step));

    match snapped {
        Some(v) => snap_to_decimals(v, decimals),
        None => {
            tracing::warn!("Overflow snapping {} to step {}", value, step);
            snap_to_decimals(value, decimals)
        }
    }
}

/// Result of [`snap_text_to_step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSnap {
    /// Nearest multiple of the step, with exactly `decimals` fractional digits.
    Snapped(String),
    /// A number smaller than one step, zero included.
    BelowStep,
    /// Not a plain unsigned decimal (empty, signed, exponent, letters).
    NotNumeric,
}

/// Round decimal text to the nearest multiple of `step`, rendered with
/// exactly `decimals` fractional digits.
///
/// The text is scaled to integer units at `decimals + 1` digits. The half-step
/// boundary is a whole number of those units, so dropping the digits beyond
/// it never changes the rounding direction and the result is exact however
/// many digits were typed. Values beyond 256 bits saturate at the largest
/// multiple of the step. A step below one unit counts as one unit.
///
/// ```text
/// snap_text_to_step("12.999", 0.01, 2)  = Snapped("13.00")
/// snap_text_to_step("0.001", 0.01, 2)   = BelowStep
/// ```
pub fn snap_text_to_step(text: &str, step: Decimal, decimals: u32) -> TextSnap {
    let decimals = decimals.min(MAX_DECIMALS);
    let Ok((int, frac)) = split_decimal(text) else {
        return TextSnap::NotNumeric;
    };

    let unit_step = step_units(step, decimals);
    let scale = decimals as usize + 1;
    let frac = &frac[..frac.len().min(scale)];

    let units = match scale_digits(int, frac, scale) {
        Some(value) => {
            let value = value.as_u256();
            let fine_step = unit_step * U256::from(10u8);
            if value < fine_step {
                return TextSnap::BelowStep;
            }
            let mut steps = value / fine_step;
            let rest = value % fine_step;
            if rest >= fine_step - rest {
                steps += U256::from(1u8);
            }
            steps.checked_mul(unit_step)
        }
        None => None,
    };

    let units = units.unwrap_or_else(|| {
        tracing::warn!("Input '{}' exceeds 256 bits, saturating", text.trim());
        (U256::MAX / unit_step) * unit_step
    });
    TextSnap::Snapped(format_units(units, decimals))
}

/// One step rendered with exactly `decimals` fractional digits, as committed
/// for empty or below-step input.
pub fn step_text(step: Decimal, decimals: u32) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    format_units(step_units(step, decimals), decimals)
}

/// `step` in integer units at `decimals`, at least one unit.
fn step_units(step: Decimal, decimals: u32) -> U256 {
    let rounded = snap_to_decimals(step, decimals).to_string();
    let units = split_decimal(&rounded)
        .ok()
        .and_then(|(int, frac)| scale_digits(int, frac, decimals as usize))
        .map(|amount| amount.as_u256())
        .unwrap_or(U256::ZERO);
    units.max(U256::from(1u8))
}

/// Render integer units as a decimal with exactly `decimals` fractional digits.
fn format_units(units: U256, decimals: u32) -> String {
    let digits = units.to_string();
    let d = decimals as usize;
    if d == 0 {
        return digits;
    }
    let padded = if digits.len() <= d {
        format!("{}{}", "0".repeat(d + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int, frac) = padded.split_at(padded.len() - d);
    format!("{}.{}", int, frac)
}

/// Whether `value` is an exact multiple of `step`.
pub fn is_step_aligned(value: Decimal, step: Decimal) -> bool {
    if step <= Decimal::ZERO {
        return false;
    }
    value
        .checked_rem(step)
        .map(|r| r.is_zero())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_limit_fraction_digits_truncates() {
        assert_eq!(limit_fraction_digits("12.999", 2), "12.99");
        assert_eq!(limit_fraction_digits("0.123456789", 6), "0.123456");
    }

    #[test]
    fn test_limit_fraction_digits_keeps_partial_input() {
        assert_eq!(limit_fraction_digits("12.", 2), "12.");
        assert_eq!(limit_fraction_digits(".", 2), ".");
        assert_eq!(limit_fraction_digits("", 2), "");
        assert_eq!(limit_fraction_digits("12", 2), "12");
        assert_eq!(limit_fraction_digits("12.5", 0), "12.");
    }

    #[test]
    fn test_limit_fraction_digits_leaves_garbage_alone() {
        assert_eq!(limit_fraction_digits("abc", 2), "abc");
        assert_eq!(limit_fraction_digits("1.2.3", 1), "1.2");
    }

    #[test]
    fn test_snap_to_decimals_rounds_half_away_from_zero() {
        assert_eq!(snap_to_decimals(dec("1.005"), 2).to_string(), "1.01");
        assert_eq!(snap_to_decimals(dec("1.004"), 2).to_string(), "1.00");
        assert_eq!(snap_to_decimals(dec("-1.005"), 2).to_string(), "-1.01");
        assert_eq!(snap_to_decimals(dec("2.5"), 0).to_string(), "3");
    }

    #[test]
    fn test_snap_to_decimals_pads() {
        assert_eq!(snap_to_decimals(dec("1.5"), 2).to_string(), "1.50");
        assert_eq!(snap_to_decimals(dec("7"), 3).to_string(), "7.000");
    }

    #[test]
    fn test_snap_to_step_half_step() {
        let snapped = snap_to_step(dec("10.37"), dec("0.5"), 2);
        assert_eq!(snapped, dec("10.5"));
        assert_eq!(snapped.to_string(), "10.50");
    }

    #[test]
    fn test_snap_to_step_rounds_up_on_commit() {
        assert_eq!(snap_to_step(dec("12.999"), dec("0.01"), 2).to_string(), "13.00");
    }

    #[test]
    fn test_snap_to_step_midpoint() {
        // 10.25 / 0.5 = 20.5 → 21
        assert_eq!(snap_to_step(dec("10.25"), dec("0.5"), 1).to_string(), "10.5");
        assert_eq!(snap_to_step(dec("10.24"), dec("0.5"), 1).to_string(), "10.0");
    }

    #[test]
    fn test_snap_to_step_is_always_aligned() {
        let step = dec("0.25");
        for raw in ["0.1", "0.13", "1.374", "99.99", "1234.5678"] {
            let snapped = snap_to_step(dec(raw), step, 2);
            assert!(is_step_aligned(snapped, step), "{} -> {}", raw, snapped);
        }
    }

    #[test]
    fn test_snap_to_step_lot_sizes() {
        assert_eq!(snap_to_step(dec("1234"), dec("100"), 0).to_string(), "1200");
        assert_eq!(snap_to_step(dec("1250"), dec("100"), 0).to_string(), "1300");
    }

    #[test]
    fn test_snap_to_step_non_positive_step_falls_back() {
        assert_eq!(snap_to_step(dec("1.234"), Decimal::ZERO, 2).to_string(), "1.23");
        assert_eq!(snap_to_step(dec("1.235"), dec("-1"), 2).to_string(), "1.24");
    }

    #[test]
    fn test_snap_text_matches_decimal_snapping() {
        let cases = [
            ("12.999", "0.01", 2, "13.00"),
            ("10.37", "0.5", 2, "10.50"),
            ("10.25", "0.5", 1, "10.5"),
            ("10.24", "0.5", 1, "10.0"),
            ("1250", "100", 0, "1300"),
            (".5", "0.01", 2, "0.50"),
            ("12.", "0.01", 2, "12.00"),
        ];
        for (text, step, decimals, expected) in cases {
            assert_eq!(
                snap_text_to_step(text, dec(step), decimals),
                TextSnap::Snapped(expected.to_string()),
                "{} step {}",
                text,
                step
            );
        }
    }

    #[test]
    fn test_snap_text_keeps_every_typed_digit() {
        let text = "123456789012.123456789012345678";
        assert_eq!(
            snap_text_to_step(text, dec("0.000000000000000001"), 18),
            TextSnap::Snapped(text.to_string())
        );
    }

    #[test]
    fn test_snap_text_pads_large_values_to_decimals() {
        assert_eq!(
            snap_text_to_step("100000000000.5", dec("0.000000000000000001"), 18),
            TextSnap::Snapped("100000000000.500000000000000000".to_string())
        );
    }

    #[test]
    fn test_snap_text_midpoint_far_past_decimals() {
        // Anything past the half step rounds up, exactly at it too.
        let step = dec("0.01");
        assert_eq!(
            snap_text_to_step("1.005", step, 2),
            TextSnap::Snapped("1.01".to_string())
        );
        assert_eq!(
            snap_text_to_step("1.00499999999999999999999999999999", step, 2),
            TextSnap::Snapped("1.00".to_string())
        );
    }

    #[test]
    fn test_snap_text_below_step_and_garbage() {
        let step = dec("0.01");
        assert_eq!(snap_text_to_step("0", step, 2), TextSnap::BelowStep);
        assert_eq!(snap_text_to_step("0.004", step, 2), TextSnap::BelowStep);
        for text in ["", "abc", "-5", "1e5", "1.2.3"] {
            assert_eq!(snap_text_to_step(text, step, 2), TextSnap::NotNumeric, "{:?}", text);
        }
    }

    #[test]
    fn test_snap_text_saturates_beyond_256_bits() {
        let huge = "9".repeat(90);
        let TextSnap::Snapped(snapped) = snap_text_to_step(&huge, dec("0.05"), 2) else {
            panic!("expected a snapped value");
        };
        let units = U256::from_str_radix(&snapped.replace('.', ""), 10).unwrap();
        let five = U256::from(5u8);
        assert_eq!(units, (U256::MAX / five) * five);
    }

    #[test]
    fn test_step_text() {
        assert_eq!(step_text(dec("0.01"), 2), "0.01");
        assert_eq!(step_text(dec("0.5"), 2), "0.50");
        assert_eq!(step_text(dec("100"), 0), "100");
        // Below one unit, and non-positive steps, count as one unit.
        assert_eq!(step_text(dec("0.0001"), 2), "0.01");
        assert_eq!(step_text(Decimal::ZERO, 2), "0.01");
    }

    #[test]
    fn test_is_step_aligned() {
        assert!(is_step_aligned(dec("10.5"), dec("0.5")));
        assert!(!is_step_aligned(dec("10.37"), dec("0.5")));
        assert!(!is_step_aligned(dec("1"), Decimal::ZERO));
    }
}
