//! Pure conversion between human decimal strings and integer chain amounts.
//!
//! Scaling works on the decimal digits themselves: the integer and fractional
//! parts are concatenated, padded or truncated to the target precision, and
//! parsed as a 256-bit unsigned integer. No floating point is involved, so a
//! value with at most `precision` fractional digits converts exactly.
//! No async, no network calls.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::market::MarketPrecision;
use crate::error::AmountError;

/// An amount in the chain's smallest indivisible unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainAmount(U256);

impl ChainAmount {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const MAX: Self = Self(U256::MAX);

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Narrow to `u128` (the native balance type of most chains), if it fits.
    pub fn to_u128(&self) -> Option<u128> {
        let limbs = self.0.as_limbs();
        if limbs[2] != 0 || limbs[3] != 0 {
            return None;
        }
        Some(limbs[0] as u128 | (limbs[1] as u128) << 64)
    }
}

impl From<u64> for ChainAmount {
    fn from(v: u64) -> Self {
        Self(U256::from(v))
    }
}

impl From<u128> for ChainAmount {
    fn from(v: u128) -> Self {
        Self(U256::from(v))
    }
}

impl fmt::Display for ChainAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainAmount {
    type Err = AmountError;

    /// Parse a plain base-10 integer (no sign, no decimal point).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| AmountError::InvalidAmountInput {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("not a base-10 integer"));
        }
        U256::from_str_radix(s, 10)
            .map(ChainAmount)
            .map_err(|_| invalid("exceeds 256 bits"))
    }
}

impl Serialize for ChainAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ChainAmount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Convert a human decimal string into a chain amount at `precision`.
///
/// Excess fractional digits are truncated, never rounded up. Empty,
/// non-numeric or negative input yields [`ChainAmount::ZERO`]; values beyond
/// 256 bits saturate at [`ChainAmount::MAX`].
///
/// ```text
/// to_chain_amount("0.1", 18)   = 100000000000000000
/// to_chain_amount("1.239", 2)  = 123
/// to_chain_amount("", 6)       = 0
/// ```
pub fn to_chain_amount(value: &str, precision: u8) -> ChainAmount {
    let (int, frac) = match split_decimal(value) {
        Ok(parts) => parts,
        Err(reason) => {
            tracing::debug!("Treating amount '{}' as zero: {}", value, reason);
            return ChainAmount::ZERO;
        }
    };

    let frac = &frac[..frac.len().min(precision as usize)];
    match scale_digits(int, frac, precision as usize) {
        Some(amount) => amount,
        None => {
            tracing::warn!(
                "Amount '{}' at precision {} exceeds 256 bits, saturating",
                value,
                precision
            );
            ChainAmount::MAX
        }
    }
}

/// [`to_chain_amount`] at a market's price precision.
pub fn to_chain_price(value: &str, market: &MarketPrecision) -> ChainAmount {
    to_chain_amount(value, market.price_precision)
}

/// Strict variant of [`to_chain_amount`] for callers that validate input.
///
/// Rejects empty and non-numeric text, negative values, more fractional
/// digits than `precision`, and values beyond 256 bits.
pub fn try_to_chain_amount(value: &str, precision: u8) -> Result<ChainAmount, AmountError> {
    let invalid = |reason: String| AmountError::InvalidAmountInput {
        input: value.to_string(),
        reason,
    };

    let (int, frac) = split_decimal(value).map_err(|r| invalid(r.to_string()))?;
    if frac.len() > precision as usize {
        return Err(invalid(format!(
            "{} fractional digits exceed precision {}",
            frac.len(),
            precision
        )));
    }
    scale_digits(int, frac, precision as usize).ok_or_else(|| invalid("exceeds 256 bits".to_string()))
}

/// Render a chain amount as a human decimal string at `precision`.
///
/// Exact inverse of [`to_chain_amount`] for in-range input; trailing
/// fractional zeros are trimmed (`1500000` at 6 → `"1.5"`).
pub fn from_chain_amount(amount: &ChainAmount, precision: u8) -> String {
    let digits = amount.0.to_string();
    let p = precision as usize;
    if p == 0 {
        return digits;
    }

    let padded = if digits.len() <= p {
        format!("{}{}", "0".repeat(p + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int, frac) = padded.split_at(padded.len() - p);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{}.{}", int, frac)
    }
}

// ─── Internals ───────────────────────────────────────────────────────────────

/// Split `"12.34"` into `("12", "34")`, validating that only ASCII digits and
/// at most one `.` are present.
pub(crate) fn split_decimal(input: &str) -> Result<(&str, &str), &'static str> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty input");
    }
    if s.starts_with('-') {
        return Err("negative amounts are not representable");
    }
    let s = s.strip_prefix('+').unwrap_or(s);

    let (int, frac) = s.split_once('.').unwrap_or((s, ""));
    if int.is_empty() && frac.is_empty() {
        return Err("no digits");
    }
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int) || !all_digits(frac) {
        return Err("not a decimal number");
    }
    Ok((int, frac))
}

/// `int ++ frac ++ zeros` parsed as an integer; `None` on 256-bit overflow.
/// `frac` must already be at most `precision` digits long.
pub(crate) fn scale_digits(int: &str, frac: &str, precision: usize) -> Option<ChainAmount> {
    let pad = precision - frac.len();
    let mut digits = String::with_capacity(int.len() + precision);
    digits.push_str(int);
    digits.push_str(frac);
    digits.extend(std::iter::repeat('0').take(pad));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Some(ChainAmount::ZERO);
    }
    U256::from_str_radix(digits, 10).ok().map(ChainAmount)
}
