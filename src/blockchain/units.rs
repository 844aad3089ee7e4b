// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion between human-readable ether amounts and wei.
//!
//! Conversions happen only at the gateway boundary; the engine stores wei.

use alloy::primitives::U256;

/// Decimals of the native currency.
pub const ETHER_DECIMALS: u8 = 18;

/// Reasons an amount string can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount is not a decimal number: {0}")]
    NotNumeric(String),

    #[error("too many decimal places (max {0})")]
    TooPrecise(u8),

    #[error("amount overflow")]
    Overflow,

    #[error("amount must be greater than zero")]
    NotPositive,
}

/// Parse a human-readable amount (e.g. `"1.5"`, `".25"`) into base units.
///
/// Only plain decimal notation is accepted: no sign, exponent, or
/// thousands separators.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::NotNumeric(amount.to_string()));
    }

    if fraction.len() > decimals as usize {
        return Err(AmountError::TooPrecise(decimals));
    }

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| AmountError::Overflow)?
    };

    let fraction = if fraction.is_empty() {
        U256::ZERO
    } else {
        // Pad with zeros to match decimals
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        U256::from_str_radix(&padded, 10).map_err(|_| AmountError::Overflow)?
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction))
        .ok_or(AmountError::Overflow)
}

/// Parse an amount that must be strictly positive.
pub fn parse_positive_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let value = parse_amount(amount, decimals)?;
    if value.is_zero() {
        return Err(AmountError::NotPositive);
    }
    Ok(value)
}

/// Format base units as a canonical decimal string with no trailing zeros.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

/// Shorthand for [`parse_positive_amount`] with ether decimals.
pub fn parse_ether(amount: &str) -> Result<U256, AmountError> {
    parse_positive_amount(amount, ETHER_DECIMALS)
}

/// Shorthand for [`format_amount`] with ether decimals.
pub fn format_ether(amount: U256) -> String {
    format_amount(amount, ETHER_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETHER: u64 = 1_000_000_000_000_000_000;

    #[test]
    fn test_parse_amount_whole() {
        assert_eq!(parse_amount("1", 18).unwrap(), U256::from(ONE_ETHER));
    }

    #[test]
    fn test_parse_amount_decimal() {
        let result = parse_amount("1.5", 18).unwrap();
        assert_eq!(result, U256::from(1_500_000_000_000_000_000u64));
    }

    #[test]
    fn test_parse_amount_leading_dot_and_whitespace() {
        let result = parse_amount("  .25 ", 18).unwrap();
        assert_eq!(result, U256::from(250_000_000_000_000_000u64));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        for input in ["abc", "-1", "+1", "1e3", "1.2.3", ".", "NaN", "inf", "1,5"] {
            assert!(
                matches!(parse_amount(input, 18), Err(AmountError::NotNumeric(_))),
                "{input} should be rejected"
            );
        }
        assert_eq!(parse_amount("", 18), Err(AmountError::Empty));
    }

    #[test]
    fn test_parse_amount_precision() {
        assert_eq!(parse_amount("0.0000001", 6), Err(AmountError::TooPrecise(6)));
        assert_eq!(parse_amount("1.5", 6).unwrap(), U256::from(1_500_000u64));
    }

    #[test]
    fn test_parse_positive_rejects_zero() {
        assert_eq!(parse_ether("0"), Err(AmountError::NotPositive));
        assert_eq!(parse_ether("0.000"), Err(AmountError::NotPositive));
        assert!(parse_ether("0.001").is_ok());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_ether(U256::from(ONE_ETHER)), "1");
        assert_eq!(format_ether(U256::from(1_500_000_000_000_000_000u64)), "1.5");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(format_ether(U256::ZERO), "0");
    }

    #[test]
    fn test_format_is_canonical() {
        let wei = parse_ether("01.500").unwrap();
        assert_eq!(format_ether(wei), "1.5");
    }
}
