//! JSON Façade
//!
//! String-in, string-out wrappers over `CoinEntry`. Every call returns an
//! `ApiResponse` envelope; failures carry the structured error instead of
//! panicking. The chain comes from the payload's `chain` field. Settings are
//! read from the environment on first use and applied once.

use super::CoinEntry;
use crate::error::SignerResult;
use crate::signing::ExternalSignature;
use crate::tx::SigningInput;
use crate::types::ApiResponse;
use crate::utils::config::SignerSettings;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static ENV_SETTINGS: OnceLock<SignerSettings> = OnceLock::new();

/// `compile` payload: the signing input plus the external signatures
#[derive(Debug, Deserialize)]
struct CompileRequest {
    #[serde(flatten)]
    input: SigningInput,
    signatures: Vec<ExternalSignature>,
}

fn parse<T: DeserializeOwned>(json: &str) -> SignerResult<T> {
    Ok(serde_json::from_str(json)?)
}

fn settings() -> SignerSettings {
    ENV_SETTINGS
        .get_or_init(|| {
            let settings = SignerSettings::from_env();
            settings.apply();
            settings
        })
        .clone()
}

fn entry_for(input: &SigningInput) -> SignerResult<CoinEntry> {
    CoinEntry::with_settings(input.chain, settings())
}

fn respond<T: Serialize>(result: SignerResult<T>) -> String {
    ApiResponse::from_result(result).to_json()
}

pub fn sign_json(json: &str) -> String {
    respond(parse::<SigningInput>(json).and_then(|input| entry_for(&input)?.sign(&input)))
}

pub fn plan_json(json: &str) -> String {
    respond(parse::<SigningInput>(json).and_then(|input| entry_for(&input)?.plan(&input)))
}

pub fn pre_image_hashes_json(json: &str) -> String {
    respond(parse::<SigningInput>(json).and_then(|input| entry_for(&input)?.pre_image_hashes(&input)))
}

pub fn compile_json(json: &str) -> String {
    respond(
        parse::<CompileRequest>(json)
            .and_then(|request| entry_for(&request.input)?.compile(&request.input, request.signatures)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const KEY: &str = "693dfe6f3ed717573eb10c24ebe5eb592fa3c239245cd499c487eb7b8ea7ed3a";

    fn request() -> Value {
        json!({
            "chain": "verge",
            "amount": 1_500_000_000u64,
            "byte_fee": 1,
            "to_address": "DQYMMpqPrnWYZaikKGTQqk5ydUaQw8nkdD",
            "change_address": "DAkEo5pNELZav7MRwBfEwHRG1aChgSUw6c",
            "private_keys": [KEY],
            "utxos": [{
                "outpoint": {
                    "hash": "a5a6e147da0f1b3f6dfd1081f91b0c6e31f030ae66c4be4cf4b0db0ac8b2407d",
                    "index": 0
                },
                "script": "76a914e4839a523f120882d11eb3dda13a18e11fdcbd4a88ac",
                "amount": 2_500_000_000u64,
                "sequence": 4294967294u32
            }]
        })
    }

    #[test]
    fn test_sign_json_envelope() {
        let response: Value = serde_json::from_str(&sign_json(&request().to_string())).unwrap();
        assert_eq!(response["success"], true);
        assert!(response["data"]["encoded"].as_str().unwrap().starts_with("01000000"));
        assert!(response["error"].is_null());
    }

    #[test]
    fn test_plan_json() {
        let response: Value = serde_json::from_str(&plan_json(&request().to_string())).unwrap();
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["amount"], 1_500_000_000u64);
        assert_eq!(response["data"]["utxos"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_errors_are_structured() {
        let response: Value = serde_json::from_str(&sign_json("{not json")).unwrap();
        assert_eq!(response["success"], false);
        assert_eq!(response["error"]["code"], "json_error");

        let mut req = request();
        req["utxos"] = json!([]);
        let response: Value = serde_json::from_str(&sign_json(&req.to_string())).unwrap();
        assert_eq!(response["error"]["code"], "no_utxos");
    }

    #[test]
    fn test_compile_json_count_mismatch() {
        let mut req = request();
        req["signatures"] = json!([]);
        let response: Value = serde_json::from_str(&compile_json(&req.to_string())).unwrap();
        assert_eq!(response["error"]["code"], "invalid_signature_count");
    }

    #[test]
    fn test_pre_image_hashes_json() {
        let response: Value = serde_json::from_str(&pre_image_hashes_json(&request().to_string())).unwrap();
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["hashes"].as_array().unwrap().len(), 1);
        assert_eq!(response["data"]["hashes"][0]["hash"].as_str().unwrap().len(), 64);
    }
}
