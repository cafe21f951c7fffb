//! Decimal-string <-> base-unit conversions for display and input

use alloy_primitives::U256;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct AmountParseError(String);

/// Parse a human decimal amount ("1.5") into base units at `decimals`.
pub fn parse_amount(value: &str, decimals: u8) -> Result<U256, AmountParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AmountParseError("empty amount".to_string()));
    }

    let (integral, fraction) = match trimmed.split_once('.') {
        Some((integral, fraction)) => (integral, fraction),
        None => (trimmed, ""),
    };

    if integral.is_empty() && fraction.is_empty() {
        return Err(AmountParseError(format!("invalid amount '{trimmed}'")));
    }
    if !integral.chars().all(|ch| ch.is_ascii_digit())
        || !fraction.chars().all(|ch| ch.is_ascii_digit())
    {
        return Err(AmountParseError(format!(
            "invalid decimal amount '{trimmed}'"
        )));
    }
    if fraction.len() > decimals as usize {
        return Err(AmountParseError(format!(
            "amount '{trimmed}' has more than {decimals} fractional digits"
        )));
    }

    let scale = U256::from(10u64).pow(U256::from(decimals));
    let integral_part = if integral.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(integral, 10)
            .map_err(|_| AmountParseError(format!("invalid amount '{trimmed}'")))?
    };

    let mut padded = fraction.to_string();
    while padded.len() < decimals as usize {
        padded.push('0');
    }
    let fraction_part = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10)
            .map_err(|_| AmountParseError(format!("invalid amount '{trimmed}'")))?
    };

    integral_part
        .checked_mul(scale)
        .and_then(|scaled| scaled.checked_add(fraction_part))
        .ok_or_else(|| AmountParseError(format!("amount '{trimmed}' is out of range")))
}

/// Format base units as a decimal string, trimming trailing zeros.
pub fn format_amount(value: U256, decimals: u8) -> String {
    let scale = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / scale;
    let fraction = value % scale;

    if fraction.is_zero() {
        return whole.to_string();
    }

    let digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let trimmed = digits.trim_end_matches('0');
    format!("{whole}.{trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_ether() {
        assert_eq!(
            parse_amount("1", 18).unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(
            parse_amount("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u64)
        );
        assert_eq!(parse_amount("0.000001", 6).unwrap(), U256::from(1u64));
        assert_eq!(parse_amount(".5", 1).unwrap(), U256::from(5u64));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_amount("abc", 18).is_err());
        assert!(parse_amount("1.2.3", 18).is_err());
        assert!(parse_amount("-1", 18).is_err());
        assert!(parse_amount("", 18).is_err());
        assert!(parse_amount(".", 18).is_err());
    }

    #[test]
    fn test_parse_rejects_excess_precision() {
        assert!(parse_amount("0.1234567", 6).is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!(
            format_amount(U256::from(1_000_000_000_000_000_000u64), 18),
            "1"
        );
        assert_eq!(
            format_amount(U256::from(1_500_000_000_000_000_000u64), 18),
            "1.5"
        );
        assert_eq!(
            format_amount(U256::from(100_000_000_000_000_000u64), 18),
            "0.1"
        );
        assert_eq!(format_amount(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_roundtrip() {
        let value = parse_amount("123.000456", 9).unwrap();
        assert_eq!(format_amount(value, 9), "123.000456");
    }
}
