//! Pre-Image Hash Generation
//!
//! Runs the normal resolution walk with a provider that records each
//! requested digest instead of signing it.

use super::SigningAlgorithm;
use crate::error::SignerResult;
use crate::script::Script;
use crate::tx::{
    ProvidedSignature, SigHashType, SignatureProvider, SignatureRequest, SignerRef, Transaction,
    TransactionSigner,
};
use crate::wallet::utxo::{TransactionPlan, Utxo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A digest that needs one signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreImageHash {
    /// The hash to sign
    #[serde(with = "crate::serde_bytes::hex32")]
    pub hash: [u8; 32],

    /// Hex public key, or hex public-key hash when only the hash is known
    pub signer_id: String,

    pub input_index: usize,

    pub description: String,

    pub algorithm: SigningAlgorithm,

    pub sighash: SigHashType,
}

impl PreImageHash {
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Digests for every signature the transaction needs, plus the plan they
/// were computed for. Pass the plan back to `compile` to keep the inputs
/// identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreImageOutput {
    pub hashes: Vec<PreImageHash>,
    pub plan: TransactionPlan,
}

/// Records requests and answers each with an empty placeholder
#[derive(Debug, Default)]
pub struct CollectingProvider {
    hashes: Vec<PreImageHash>,
}

impl CollectingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_hashes(self) -> Vec<PreImageHash> {
        self.hashes
    }
}

impl SignatureProvider for CollectingProvider {
    fn provide(&mut self, request: SignatureRequest<'_>) -> SignerResult<Option<ProvidedSignature>> {
        let (signer_id, kind) = match request.signer {
            SignerRef::PublicKeyHash(hash) => (hex::encode(hash), "key hash"),
            SignerRef::PublicKey(key) => (hex::encode(key), "public key"),
            SignerRef::MultisigKey(key) => (hex::encode(key), "multisig key"),
        };

        self.hashes.push(PreImageHash {
            hash: request.digest,
            signer_id,
            input_index: request.input_index,
            description: format!("input {} signed by {}", request.input_index, kind),
            algorithm: SigningAlgorithm::Secp256k1Ecdsa,
            sighash: request.hash_type,
        });

        Ok(Some(ProvidedSignature {
            signature: Vec::new(),
            public_key: Vec::new(),
        }))
    }
}

/// Digests for every signature `unsigned` needs, in walk order
pub fn collect_pre_image_hashes(
    unsigned: &Transaction,
    utxos: &[Utxo],
    scripts: &HashMap<String, Script>,
    hash_type: SigHashType,
) -> SignerResult<Vec<PreImageHash>> {
    let mut collector = CollectingProvider::new();
    TransactionSigner::new(unsigned, utxos, scripts, hash_type).sign(&mut collector)?;
    Ok(collector.into_hashes())
}
