//! Relay request/quote types and client.
//!
//! - Build the estimate request for a bundle of calls
//! - Parse the quote: cost summary plus one typed-data payload per signing role
//! - Submit the untouched quote with a complete signature set

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy::primitives::Address;
use async_trait::async_trait;
use bookie_types::{BookieError, CallDescriptor, Hex, Result, TypedDataPayload};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

pub mod relay_client;

pub use relay_client::{RelayClient, RelayConfig};

/// Suffix the relay uses for quote keys holding a payload to sign.
const TYPED_DATA_SUFFIX: &str = "TypedData";

/// Suffix of the matching key in the execute request's `signatures`.
const SIGNATURE_SUFFIX: &str = "Signature";

/// Body of `POST /single-chain/estimate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub source_chain: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_chain: Option<u64>,
    pub source_token: Address,
    pub user_address: Address,
    /// Fixed-point amount of `source_token`, as a decimal string.
    pub token_amount: String,
    pub transactions: Vec<CallDescriptor>,
    #[serde(rename = "expectedERC20Tokens")]
    pub expected_erc20_tokens: Vec<Address>,
}

/// Cost breakdown returned with a quote.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    #[serde(deserialize_with = "decimal_from_number_or_string")]
    pub total_amount: Decimal,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn decimal_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let text = match &value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => return Err(serde::de::Error::custom(format!("expected a number, got {}", other))),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(serde::de::Error::custom)
}

/// A typed-data payload together with the role it is signed for.
#[derive(Debug, Clone)]
pub struct RoleTypedData {
    /// Role name, e.g. `funding`, `fundingToken`, `peaze`.
    pub role: String,
    pub payload: TypedDataPayload,
}

/// Quote returned by the estimate call.
///
/// The raw JSON is kept as received and is what `execute` submits; the parsed
/// views exist only for reading.
#[derive(Debug, Clone)]
pub struct Quote {
    raw: serde_json::Value,
    cost_summary: CostSummary,
    cost_summary_json: serde_json::Value,
    typed_data: Vec<RoleTypedData>,
}

impl Quote {
    /// Parse an estimate response body `{ quote, costSummary }`.
    ///
    /// `costSummary` is read from the top level, falling back to the one inside `quote`.
    pub fn from_estimate_response(body: serde_json::Value) -> Result<Self> {
        let mut body = match body {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(BookieError::InvalidResponse(format!(
                    "estimate response is not an object: {}",
                    other
                )))
            }
        };

        let raw = body
            .remove("quote")
            .filter(|q| q.is_object())
            .ok_or_else(|| BookieError::InvalidResponse("estimate response has no quote object".into()))?;

        let cost_summary_json = body
            .remove("costSummary")
            .or_else(|| raw.get("costSummary").cloned())
            .ok_or_else(|| BookieError::InvalidResponse("estimate response has no costSummary".into()))?;
        let cost_summary: CostSummary = serde_json::from_value(cost_summary_json.clone())
            .map_err(|e| BookieError::InvalidResponse(format!("invalid costSummary: {}", e)))?;

        let mut typed_data = Vec::new();
        if let Some(fields) = raw.as_object() {
            for (key, value) in fields {
                let Some(role) = key.strip_suffix(TYPED_DATA_SUFFIX) else {
                    continue;
                };
                if role.is_empty() || value.is_null() {
                    continue;
                }
                let payload: TypedDataPayload = serde_json::from_value(value.clone())
                    .map_err(|e| BookieError::InvalidResponse(format!("invalid {}: {}", key, e)))?;
                typed_data.push(RoleTypedData {
                    role: role.to_string(),
                    payload,
                });
            }
        }

        if typed_data.is_empty() {
            return Err(BookieError::InvalidResponse(
                "quote carries no typed data to sign".into(),
            ));
        }

        Ok(Self {
            raw,
            cost_summary,
            cost_summary_json,
            typed_data,
        })
    }

    /// The quote exactly as the relay sent it.
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    pub fn cost_summary(&self) -> &CostSummary {
        &self.cost_summary
    }

    pub fn cost_summary_json(&self) -> &serde_json::Value {
        &self.cost_summary_json
    }

    pub fn typed_data(&self) -> &[RoleTypedData] {
        &self.typed_data
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.typed_data.iter().map(|t| t.role.as_str())
    }
}

/// Signatures keyed by role, serialized as `{ "<role>Signature": "0x..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SignatureSet {
    signatures: BTreeMap<String, Hex>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: &str, signature: Hex) {
        self.signatures
            .insert(format!("{}{}", role, SIGNATURE_SUFFIX), signature);
    }

    pub fn get(&self, role: &str) -> Option<&Hex> {
        self.signatures.get(&format!("{}{}", role, SIGNATURE_SUFFIX))
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Roles of `quote` that have no signature yet.
    pub fn missing_for(&self, quote: &Quote) -> Vec<String> {
        quote
            .roles()
            .filter(|role| self.get(role).is_none())
            .map(str::to_string)
            .collect()
    }

    /// Fail with `IncompleteSignatures` unless every role of `quote` is signed.
    pub fn ensure_complete(&self, quote: &Quote) -> Result<()> {
        let missing = self.missing_for(quote);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(BookieError::IncompleteSignatures(missing))
        }
    }
}

/// Body of `POST /single-chain/execute`.
#[derive(Debug, Serialize)]
pub struct ExecuteRequest<'a> {
    pub quote: &'a serde_json::Value,
    pub signatures: &'a SignatureSet,
}

/// Submission receipt, passed through as the relay returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionReceipt(pub serde_json::Value);

/// Fee-quoting and submission service.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn estimate(&self, request: &EstimateRequest) -> Result<Quote>;
    async fn execute(&self, quote: &Quote, signatures: &SignatureSet) -> Result<ExecutionReceipt>;
}
