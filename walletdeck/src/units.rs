//! Conversion between display-unit decimal strings and base-unit integers.
//!
//! Amounts typed by a user (`"0.05"`) are scaled by `10^decimals` into a
//! [`U256`] with alloy's unit helpers. Conversion is exact: input with more
//! fractional digits than the unit allows is rejected rather than truncated.

use alloy::primitives::U256;
use alloy::primitives::utils::{self, ParseUnits, Unit};

/// Decimal exponent of ether and most EVM native tokens.
pub const ETHER_DECIMALS: u8 = 18;

/// Parse a display-unit decimal string into base units.
///
/// Accepts an optional integer part and an optional fractional part
/// separated by a single `.` (`"1"`, `"1.5"`, `".5"`, `"1."`). Surrounding
/// whitespace is ignored. Returns `None` for empty input, signs, exponents,
/// non-digit characters, more than `decimals` fractional digits, or values
/// that do not fit in 256 bits.
#[must_use]
pub fn parse_units(input: &str, decimals: u8) -> Option<U256> {
    let input = input.trim();
    let (integer, fraction) = input.split_once('.').unwrap_or((input, ""));

    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    // alloy truncates extra fractional digits.
    if fraction.len() > usize::from(decimals) {
        return None;
    }

    // alloy scales with wrapping arithmetic, so the whole part must fit.
    let unit = Unit::new(decimals)?;
    let whole = if integer.is_empty() {
        U256::ZERO
    } else {
        integer.parse::<U256>().ok()?
    };
    whole.checked_mul(unit.wei())?;

    let integer = if integer.is_empty() { "0" } else { integer };
    let normalized = if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    };
    match utils::parse_units(&normalized, decimals) {
        // A wrapped value no longer carries the whole part.
        Ok(ParseUnits::U256(value)) if value / unit.wei() == whole => Some(value),
        Ok(_) | Err(_) => None,
    }
}

/// Parse an ether amount (18 decimals) into wei.
#[must_use]
pub fn parse_ether(input: &str) -> Option<U256> {
    parse_units(input, ETHER_DECIMALS)
}

/// Format a base-unit amount as a display-unit decimal string.
///
/// Trailing fractional zeros are dropped, and the radix point is omitted for
/// whole amounts: `1500000000000000000` at 18 decimals is `"1.5"`.
#[must_use]
pub fn format_units(value: U256, decimals: u8) -> String {
    let Ok(text) = utils::format_units(value, decimals) else {
        return value.to_string();
    };
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}
