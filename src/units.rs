//! Fixed-point helpers for USD prices, fractions and native-token amounts.
//!
//! Every value in the fee economy is an unsigned 256-bit integer carrying 18
//! fractional digits: `amount_display = raw / 10^18`.  Products of two scaled
//! values are taken through a 512-bit intermediate so that `a * b / c` never
//! overflows before the division.

use crate::error::FeeError;
use primitive_types::{U256, U512};

/// Number of fractional digits carried by USD, fraction and native amounts.
pub const DECIMALS: usize = 18;

/// `10^18`, the fixed-point unit.
pub const SCALE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Computes `a * b / denominator`, truncating toward zero.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, FeeError> {
    if denominator.is_zero() {
        return Err(FeeError::DivisionByZero);
    }
    let wide = a.full_mul(b) / U512::from(denominator);
    U256::try_from(wide).map_err(|_| FeeError::Overflow)
}

/// Scales `value` by a fixed-point factor: `value * factor / SCALE`.
pub fn scale_by(value: U256, factor: U256) -> Result<U256, FeeError> {
    mul_div(value, factor, SCALE)
}

/// Whole units expressed in fixed point (`units * 10^18`).
pub fn whole(units: u64) -> U256 {
    U256::from(units) * SCALE
}

/// Parses a decimal string such as `"1.5"` into its fixed-point value.
pub fn parse_fixed(input: &str) -> Result<U256, FeeError> {
    let trimmed = input.trim();
    let invalid = || FeeError::InvalidFixedPoint(input.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };
    if frac_part.len() > DECIMALS
        || !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
        || (int_part.is_empty() && frac_part.is_empty())
    {
        return Err(invalid());
    }
    let int_value = if int_part.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(int_part).map_err(|_| invalid())?
    };
    let frac_value = if frac_part.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{frac_part:0<width$}", width = DECIMALS);
        U256::from_dec_str(&padded).map_err(|_| invalid())?
    };
    int_value
        .checked_mul(SCALE)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or(FeeError::Overflow)
}

/// Renders a fixed-point value as a decimal string, trimming trailing zeros.
pub fn format_fixed(value: U256) -> String {
    let int_part = value / SCALE;
    let frac_part = (value % SCALE).low_u64();
    if frac_part == 0 {
        return int_part.to_string();
    }
    let frac = format!("{frac_part:0width$}", width = DECIMALS);
    format!("{int_part}.{}", frac.trim_end_matches('0'))
}

/// Serde adapter reading and writing fixed-point values as decimal strings.
pub mod decimal {
    use super::{format_fixed, parse_fixed};
    use primitive_types::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    /// Serializes `value` as a decimal string.
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_fixed(*value))
    }

    /// Deserializes a decimal string such as `"0.25"`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_fixed(&raw).map_err(D::Error::custom)
    }
}
