//! Conversion between integer base units and decimal UI amounts
//!
//! Everything is done on strings and integers: a float never touches an
//! amount, so converting back and forth is lossless.

use crate::error::{StakePoolClientError, StakePoolClientResult};

/// Decimals of the native token
pub const SOL_DECIMALS: u8 = 9;

/// Lamports in one SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert a decimal SOL string into lamports, truncating anything finer than
/// one lamport
pub fn sol_to_lamports(sol: &str) -> StakePoolClientResult<u64> {
    ui_amount_to_amount(sol, SOL_DECIMALS)
}

/// Render lamports as a decimal SOL string
pub fn lamports_to_sol(lamports: i128) -> String {
    amount_to_ui_amount(lamports, SOL_DECIMALS)
}

/// Convert a decimal UI amount into base units of a mint with `decimals`.
///
/// Digits beyond `decimals` are dropped, never rounded up.
pub fn ui_amount_to_amount(ui_amount: &str, decimals: u8) -> StakePoolClientResult<u64> {
    let invalid = || StakePoolClientError::InvalidAmount(ui_amount.to_string());
    let trimmed = ui_amount.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let scale = 10u64
        .checked_pow(decimals as u32)
        .ok_or(StakePoolClientError::CalculationFailure)?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .map_err(|_| invalid())?
            .checked_mul(scale)
            .ok_or_else(invalid)?
    };

    let kept = &fraction[..fraction.len().min(decimals as usize)];
    let fraction_units = if kept.is_empty() {
        0
    } else {
        let padding = 10u64.pow((decimals as usize - kept.len()) as u32);
        kept.parse::<u64>()
            .map_err(|_| invalid())?
            .checked_mul(padding)
            .ok_or_else(invalid)?
    };

    whole_units.checked_add(fraction_units).ok_or_else(invalid)
}

/// Render base units of a mint with `decimals` as a decimal string.
///
/// The sign is kept, trailing fractional zeros are dropped.
pub fn amount_to_ui_amount(amount: i128, decimals: u8) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let digits = amount.unsigned_abs().to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return format!("{}{}", sign, digits);
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{}{}", sign, whole)
    } else {
        format!("{}{}.{}", sign, whole, fraction)
    }
}
