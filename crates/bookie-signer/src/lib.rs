//! EIP-712 signing of relay typed-data payloads.
//!
//! Flow: payload → primary type (explicit or inferred) → alloy `TypedData`
//! → signing hash → secp256k1 signature as 0x-prefixed `r || s || v`.

use std::str::FromStr;

use alloy::dyn_abi::eip712::TypedData;
use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use bookie_types::{bytes_to_hex, BookieError, Hex, Result, TypedDataPayload};
use tracing::debug;

const DOMAIN_TYPE: &str = "EIP712Domain";

/// Anything that can produce the signatures a quote asks for.
pub trait TypedDataSigner: Send + Sync {
    fn address(&self) -> Address;
    fn sign(&self, payload: &TypedDataPayload) -> Result<Hex>;
}

/// Local private-key signer.
pub struct QuoteSigner {
    signer: PrivateKeySigner,
}

impl QuoteSigner {
    /// Load a hex private key, with or without `0x`.
    pub fn from_private_key(key: &str) -> Result<Self> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer = PrivateKeySigner::from_str(key)
            .map_err(|e| BookieError::SigningFailure(format!("invalid private key: {}", e)))?;
        Ok(Self { signer })
    }
}

impl TypedDataSigner for QuoteSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    fn sign(&self, payload: &TypedDataPayload) -> Result<Hex> {
        let hash = signing_hash(payload)?;
        let signature = self
            .signer
            .sign_hash_sync(&hash)
            .map_err(|e| BookieError::SigningFailure(e.to_string()))?;
        debug!(signer = %self.signer.address(), %hash, "signed typed data");
        Ok(bytes_to_hex(&signature.as_bytes()))
    }
}

/// Strip array suffixes: `Call[]` and `Call[2][]` both name `Call`.
fn base_type(ty: &str) -> &str {
    ty.split('[').next().unwrap_or(ty)
}

/// The struct type that no other struct type references.
///
/// An explicit `primaryType` wins when it names a declared type.
pub fn primary_type(payload: &TypedDataPayload) -> Result<String> {
    if let Some(explicit) = &payload.primary_type {
        if !payload.types.contains_key(explicit) {
            return Err(BookieError::SigningFailure(format!(
                "primary type {} is not declared",
                explicit
            )));
        }
        return Ok(explicit.clone());
    }

    let roots: Vec<&String> = payload
        .types
        .keys()
        .filter(|name| name.as_str() != DOMAIN_TYPE)
        .filter(|name| {
            !payload
                .types
                .iter()
                .filter(|(other, _)| other.as_str() != DOMAIN_TYPE)
                .flat_map(|(_, fields)| fields.iter())
                .any(|field| base_type(&field.ty) == name.as_str())
        })
        .collect();

    match roots.as_slice() {
        [only] => Ok((*only).clone()),
        [] => Err(BookieError::SigningFailure("typed data has no primary type".into())),
        many => Err(BookieError::SigningFailure(format!(
            "ambiguous primary type: {}",
            many.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// EIP-712 digest of the payload: `keccak256(0x1901 || domainSeparator || structHash)`.
pub fn signing_hash(payload: &TypedDataPayload) -> Result<B256> {
    let primary = primary_type(payload)?;

    let mut types = serde_json::Map::new();
    for (name, fields) in &payload.types {
        if name == DOMAIN_TYPE {
            continue;
        }
        let fields = serde_json::to_value(fields)
            .map_err(|e| BookieError::SigningFailure(e.to_string()))?;
        types.insert(name.clone(), fields);
    }

    let mut domain = payload.domain.clone();
    if let Some(chain_id) = domain.get("chainId").and_then(|v| v.as_u64()) {
        domain.insert("chainId".into(), serde_json::Value::String(format!("0x{:x}", chain_id)));
    }

    let typed: TypedData = serde_json::from_value(serde_json::json!({
        "types": types,
        "primaryType": primary,
        "domain": domain,
        "message": payload.message,
    }))
    .map_err(|e| BookieError::SigningFailure(format!("malformed typed data: {}", e)))?;

    typed
        .eip712_signing_hash()
        .map_err(|e| BookieError::SigningFailure(format!("EIP-712 encoding failed: {}", e)))
}
