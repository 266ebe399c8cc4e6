use crate::errors::AmountError;
use alloy_primitives::U256;

pub const ETHER_DECIMALS: u8 = 18;

/// Converts a human decimal string into minor units without touching floats.
///
/// Accepts `"1"`, `"1.5"`, `".5"`, `"5."`. Rejects signs, exponents, separators
/// and more fractional digits than `decimals`.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty())
        || !all_digits(int_part)
        || !all_digits(frac_part)
    {
        return Err(AmountError::Malformed(trimmed.to_string()));
    }
    if frac_part.len() > decimals as usize {
        return Err(AmountError::TooPrecise { max: decimals });
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in frac_part.len()..decimals as usize {
        digits.push('0');
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow)
}

pub fn parse_ether(input: &str) -> Result<U256, AmountError> {
    parse_units(input, ETHER_DECIMALS)
}

/// Bid amounts must be positive ether values.
pub fn parse_bid_amount(input: &str) -> Result<U256, AmountError> {
    let wei = parse_ether(input)?;
    if wei.is_zero() {
        return Err(AmountError::Zero);
    }
    Ok(wei)
}

/// Renders minor units as a decimal string with trailing zeros removed.
pub fn format_units(value: U256, decimals: u8) -> String {
    let raw = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return raw;
    }
    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - raw.len()), raw)
    } else {
        raw
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

pub fn format_ether(value: U256) -> String {
    format_units(value, ETHER_DECIMALS)
}
