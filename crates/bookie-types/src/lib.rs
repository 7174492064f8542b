use std::collections::BTreeMap;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 0x-prefixed hex string (e.g. "0x1234...").
pub type Hex = String;

/// Errors shared by every crate in the workspace.
#[derive(Debug, Error)]
pub enum BookieError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid odds: {0}")]
    InvalidOdds(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Non-2xx answer from the relay. `details` carries the body's `data` field.
    #[error("{message}")]
    RelayRejected {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("relay unavailable: {0}")]
    RelayUnavailable(String),

    #[error("unexpected relay response: {0}")]
    InvalidResponse(String),

    #[error("signing failed: {0}")]
    SigningFailure(String),

    #[error("missing signatures for roles: {}", .0.join(", "))]
    IncompleteSignatures(Vec<String>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("{0}")]
    Other(String),
}

impl BookieError {
    /// Structured detail attached by the relay, if any.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            BookieError::RelayRejected { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BookieError>;

/// One market pick: condition (market) and outcome identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetSelection {
    pub condition_id: U256,
    pub outcome_id: u64,
}

impl BetSelection {
    pub fn new(condition_id: U256, outcome_id: u64) -> Self {
        Self { condition_id, outcome_id }
    }

    /// Parse decimal identifiers as published by the protocol's subgraph.
    pub fn parse(condition_id: &str, outcome_id: &str) -> Result<Self> {
        let condition_id = U256::from_str_radix(condition_id.trim(), 10)
            .map_err(|e| BookieError::Other(format!("invalid condition id {:?}: {}", condition_id, e)))?;
        let outcome_id = outcome_id
            .trim()
            .parse::<u64>()
            .map_err(|e| BookieError::Other(format!("invalid outcome id {:?}: {}", outcome_id, e)))?;
        Ok(Self { condition_id, outcome_id })
    }
}

/// A pending on-chain call: target contract plus ABI-encoded calldata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDescriptor {
    pub to: Address,
    pub data: Bytes,
}

impl CallDescriptor {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self { to, data: data.into() }
    }

    /// First four bytes of the calldata, if present.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// One field of an EIP-712 struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// EIP-712 domain/types/message triple as handed out by the relay.
///
/// `types` normally omits `EIP712Domain` and `primaryType` is usually absent;
/// the signer derives both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedDataPayload {
    pub domain: serde_json::Map<String, serde_json::Value>,
    pub types: BTreeMap<String, Vec<TypedField>>,
    #[serde(rename = "primaryType", default, skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<String>,
    pub message: serde_json::Value,
}

/// Parse a 0x-prefixed (or bare) hex address.
pub fn parse_address(s: &str) -> Result<Address> {
    s.trim()
        .parse::<Address>()
        .map_err(|e| BookieError::InvalidAddress(format!("{}: {}", s, e)))
}

/// Parse a hex string to a big-endian byte array.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| BookieError::InvalidHex(e.to_string()))
}

/// Convert bytes to a 0x-prefixed hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> Hex {
    format!("0x{}", hex::encode(bytes))
}
