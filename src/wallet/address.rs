//! Address Codec
//!
//! Resolves chain addresses to locking scripts and derives addresses from
//! public keys. Legacy addresses are Base58Check with the chain's version
//! bytes; segwit v0 addresses are Bech32 with the chain's HRP.

use crate::script::Script;
use crate::types::ChainParams;
use crate::utils::crypto::{base58check_decode, base58check_encode, hash160};
use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};

/// Address decoding failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid Base58Check encoding")]
    InvalidBase58,

    #[error("Unknown address version byte {0:#04x}")]
    UnknownPrefix(u8),

    #[error("Invalid payload length {0}")]
    InvalidLength(usize),

    #[error("Invalid bech32 encoding: {0}")]
    InvalidBech32(String),

    #[error("Address belongs to another network (hrp {0})")]
    WrongNetwork(String),

    #[error("Unsupported witness version {0}")]
    UnsupportedWitnessVersion(u8),

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Segwit addresses are not supported on this chain")]
    SegwitUnsupported,
}

/// What an address commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPayload {
    PublicKeyHash([u8; 20]),
    ScriptHash([u8; 20]),
    WitnessPublicKeyHash([u8; 20]),
    WitnessScriptHash([u8; 32]),
}

impl AddressPayload {
    /// Locking script paying to this address
    pub fn to_script(&self) -> Script {
        match self {
            AddressPayload::PublicKeyHash(h) => Script::pay_to_public_key_hash(h),
            AddressPayload::ScriptHash(h) => Script::pay_to_script_hash(h),
            AddressPayload::WitnessPublicKeyHash(h) => Script::pay_to_witness_public_key_hash(h),
            AddressPayload::WitnessScriptHash(h) => Script::pay_to_witness_script_hash(h),
        }
    }

    /// Raw hash or witness program
    pub fn data(&self) -> Vec<u8> {
        match self {
            AddressPayload::PublicKeyHash(h)
            | AddressPayload::ScriptHash(h)
            | AddressPayload::WitnessPublicKeyHash(h) => h.to_vec(),
            AddressPayload::WitnessScriptHash(h) => h.to_vec(),
        }
    }
}

/// Address style produced by `derive_address`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// Bech32 on chains that have an HRP, Base58 P2PKH elsewhere
    #[default]
    Default,
    Legacy,
    Segwit,
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode an address for the given chain
pub fn decode_address(address: &str, params: &ChainParams) -> Result<AddressPayload, AddressError> {
    let address = address.trim();

    if let Some(hrp) = params.hrp {
        let lower = address.to_lowercase();
        if lower.starts_with(&format!("{}1", hrp)) {
            return decode_segwit(address, hrp);
        }
    }

    decode_legacy(address, params)
}

fn decode_legacy(address: &str, params: &ChainParams) -> Result<AddressPayload, AddressError> {
    let payload = base58check_decode(address).ok_or(AddressError::InvalidBase58)?;
    if payload.len() != 21 {
        return Err(AddressError::InvalidLength(payload.len()));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);

    match payload[0] {
        p if p == params.p2pkh_prefix => Ok(AddressPayload::PublicKeyHash(hash)),
        p if p == params.p2sh_prefix => Ok(AddressPayload::ScriptHash(hash)),
        p => Err(AddressError::UnknownPrefix(p)),
    }
}

fn decode_segwit(address: &str, expected_hrp: &str) -> Result<AddressPayload, AddressError> {
    let (hrp, data, variant) =
        bech32::decode(address).map_err(|e| AddressError::InvalidBech32(e.to_string()))?;

    if hrp != expected_hrp {
        return Err(AddressError::WrongNetwork(hrp));
    }

    let (version, program) = data
        .split_first()
        .ok_or_else(|| AddressError::InvalidBech32("empty data".to_string()))?;

    let version = version.to_u8();
    if version != 0 || variant != Variant::Bech32 {
        return Err(AddressError::UnsupportedWitnessVersion(version));
    }

    let program =
        Vec::<u8>::from_base32(program).map_err(|e| AddressError::InvalidBech32(e.to_string()))?;

    match program.len() {
        20 => {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&program);
            Ok(AddressPayload::WitnessPublicKeyHash(hash))
        }
        32 => {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&program);
            Ok(AddressPayload::WitnessScriptHash(hash))
        }
        len => Err(AddressError::InvalidLength(len)),
    }
}

/// Locking script for an address on the given chain
pub fn script_for_address(address: &str, params: &ChainParams) -> Result<Script, AddressError> {
    decode_address(address, params).map(|payload| payload.to_script())
}

pub fn validate_address(address: &str, params: &ChainParams) -> bool {
    decode_address(address, params).is_ok()
}

// =============================================================================
// Encoding
// =============================================================================

pub fn encode_legacy(prefix: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(prefix);
    payload.extend_from_slice(hash);
    base58check_encode(&payload)
}

pub fn encode_segwit(hrp: &str, program: &[u8]) -> Result<String, AddressError> {
    let version =
        bech32::u5::try_from_u8(0).map_err(|e| AddressError::InvalidBech32(e.to_string()))?;

    let mut data = Vec::with_capacity(1 + program.len() * 8 / 5 + 1);
    data.push(version);
    data.extend(program.to_base32());

    bech32::encode(hrp, data, Variant::Bech32).map_err(|e| AddressError::InvalidBech32(e.to_string()))
}

/// Derive the address for a public key
pub fn derive_address(
    public_key: &[u8],
    params: &ChainParams,
    kind: AddressKind,
) -> Result<String, AddressError> {
    bitcoin::secp256k1::PublicKey::from_slice(public_key)
        .map_err(|_| AddressError::InvalidPublicKey)?;

    let hash = hash160(public_key);
    let use_segwit = match kind {
        AddressKind::Default => params.hrp.is_some() && public_key.len() == 33,
        AddressKind::Legacy => false,
        AddressKind::Segwit => true,
    };

    if !use_segwit {
        return Ok(encode_legacy(params.p2pkh_prefix, &hash));
    }

    let hrp = params.hrp.ok_or(AddressError::SegwitUnsupported)?;
    if public_key.len() != 33 {
        return Err(AddressError::InvalidPublicKey);
    }
    encode_segwit(hrp, &hash)
}
