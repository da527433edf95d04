//! Conversions between raw ledger integers and display amounts.

use alloy::primitives::U256;

/// Format a raw ledger integer as a decimal string scaled by `decimals`.
///
/// Trailing fractional zeros are dropped, so `1500` with 3 decimals is `"1.5"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;

    if decimals == 0 || value.is_zero() {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };

    let (integer, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}

/// Parse a display amount into a raw ledger integer.
///
/// More fractional digits than `decimals` is an error rather than a truncation.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, String> {
    let amount = amount.trim();

    if amount.is_empty() {
        return Err("Amount cannot be empty".to_string());
    }
    if amount.starts_with('-') {
        return Err("Amount cannot be negative".to_string());
    }

    let (integer, fraction) = match amount.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (amount, ""),
    };

    if fraction.contains('.') {
        return Err("Invalid amount format".to_string());
    }
    if integer.is_empty() && fraction.is_empty() {
        return Err("Invalid amount format".to_string());
    }
    if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid amount: {amount}"));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(format!("Amount has more than {decimals} decimal places"));
    }

    let digits = format!("{integer}{fraction:0<width$}", width = decimals as usize);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10).map_err(|e| format!("Invalid amount: {e}"))
}

/// Parse an amount for a mutating ledger call; it must be strictly positive.
pub fn parse_positive_amount(amount: &str, decimals: u8) -> Result<U256, String> {
    let value = parse_units(amount, decimals)?;
    if value.is_zero() {
        return Err("Amount must be greater than zero".to_string());
    }
    Ok(value)
}
