//! Token descriptors and amount scaling.
//!
//! Human amounts from configuration are `Decimal`; on-chain amounts are `u64`
//! base units. Conversions between the two never go through floating point.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest scale `Decimal` can represent.
const MAX_DECIMALS: u8 = 28;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AmountError {
    #[error("Negative amount: {0}")]
    Negative(Decimal),
    #[error("Amount {amount} with {decimals} decimals does not fit in u64")]
    Overflow { amount: Decimal, decimals: u8 },
    #[error("Unsupported decimal precision: {0}")]
    UnsupportedDecimals(u8),
}

/// A token as configured: symbol, mint address and decimal precision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

impl TokenDescriptor {
    pub fn new(symbol: impl Into<String>, address: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address: address.into(),
            decimals,
        }
    }

    /// Parse the mint address
    pub fn mint(&self) -> Result<Pubkey, solana_sdk::pubkey::ParsePubkeyError> {
        Pubkey::from_str(&self.address)
    }

    /// Convert a human amount (e.g. `0.01`) to base units, truncating dust below precision
    pub fn to_raw(&self, amount: Decimal) -> Result<u64, AmountError> {
        ui_to_raw(amount, self.decimals)
    }

    /// Convert base units back to a human amount
    pub fn to_ui(&self, raw: u64) -> Decimal {
        raw_to_ui(raw, self.decimals)
    }
}

impl fmt::Display for TokenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Scale a human amount by `10^decimals` into base units
pub fn ui_to_raw(amount: Decimal, decimals: u8) -> Result<u64, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals(decimals));
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative(amount));
    }

    let scale = Decimal::from_i128_with_scale(10i128.pow(decimals as u32), 0);
    amount
        .checked_mul(scale)
        .and_then(|scaled| scaled.trunc().to_u64())
        .ok_or(AmountError::Overflow { amount, decimals })
}

/// Express base units as a human amount with `decimals` fractional digits
pub fn raw_to_ui(raw: u64, decimals: u8) -> Decimal {
    let scale = decimals.min(MAX_DECIMALS) as u32;
    Decimal::from_i128_with_scale(raw as i128, scale).normalize()
}
