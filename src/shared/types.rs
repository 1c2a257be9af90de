//! Common types used across the application

use std::fmt;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::domain::amount;
use crate::shared::errors::InvalidAmount;

/// Token representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    pub name: Option<String>,
}

impl Token {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// Amount representation with precision.
///
/// `value` is always the authoritative base-unit quantity; the display form is
/// derived from it and never fed back into a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount {
    pub value: U256,
    pub decimals: u8,
}

impl Amount {
    pub fn new(value: U256, decimals: u8) -> Self {
        Self { value, decimals }
    }

    /// Parse a human-entered amount for the given token.
    pub fn from_display(display: &str, token: &Token) -> Result<Self, InvalidAmount> {
        let value = amount::to_base_units(display, token.decimals)?;
        Ok(Self::new(value, token.decimals))
    }

    pub fn to_display(&self) -> String {
        amount::to_display(self.value, self.decimals)
    }

    pub fn to_display_rounded(&self, max_fraction_digits: usize) -> String {
        amount::to_display_rounded(self.value, self.decimals, max_fraction_digits)
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

/// Hash of a submitted ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub B256);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger acknowledgement that a transaction was included and succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

impl TxReceipt {
    pub fn new(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            block_number: None,
            gas_used: None,
        }
    }
}
