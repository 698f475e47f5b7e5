//! Conversion between human decimal amounts and on-chain integers.
//!
//! BNB and GWT both use 18 decimals. Every manager method converts exactly
//! once at the chain boundary.

use alloy_primitives::U256;
use alloy_primitives::utils::{format_units, parse_units};
use gw_api_types::format::trim_decimal;

use crate::error::{ContractError, Result};

pub const DECIMALS: u8 = 18;

/// `"1.5"` → `1500000000000000000`.
pub fn to_wei(amount: &str) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() || amount.starts_with('-') || amount.starts_with('+') {
        return Err(ContractError::InvalidAmount(amount.to_string()));
    }
    parse_units(amount, DECIMALS)
        .map(|parsed| parsed.get_absolute())
        .map_err(|_| ContractError::InvalidAmount(amount.to_string()))
}

/// `1500000000000000000` → `"1.5"`.
pub fn from_wei(amount: U256) -> String {
    match format_units(amount, DECIMALS) {
        Ok(formatted) => trim_decimal(&formatted, usize::from(DECIMALS)),
        Err(_) => "0".to_string(),
    }
}
