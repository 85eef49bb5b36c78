//! Ether / wei conversion

use crate::error::{ClientError, Result};

/// Decimals of the native token
pub const ETHER_DECIMALS: u32 = 18;

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Parse a decimal ether amount ("0.05", "1", "2.") into wei.
pub fn parse_ether(amount: &str) -> Result<u128> {
    let amount = amount.trim();
    let invalid = || ClientError::Validation(format!("invalid ether amount: '{amount}'"));

    if amount.is_empty() || amount.starts_with('-') {
        return Err(invalid());
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > ETHER_DECIMALS as usize {
        return Err(ClientError::Validation(format!(
            "ether amount '{amount}' has more than {ETHER_DECIMALS} decimals"
        )));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_wei: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = ETHER_DECIMALS as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(WEI_PER_ETHER)
        .and_then(|w| w.checked_add(frac_wei))
        .ok_or_else(|| ClientError::Validation(format!("ether amount '{amount}' overflows")))
}

/// Format wei as a decimal ether string without trailing zeros.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
