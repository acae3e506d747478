//! Transaction Compiler
//!
//! Assembles a signed transaction from externally produced signatures.
//! Signatures are consumed in the order `collect_pre_image_hashes` lists
//! the digests.

use crate::error::{ErrorCode, SignerError, SignerResult};
use crate::script::Script;
use crate::tx::{
    ProvidedSignature, SigHashType, SignatureProvider, SignatureRequest, SignerRef, Transaction,
    TransactionSigner,
};
use crate::utils::crypto::hash160;
use crate::wallet::keys::verify;
use crate::wallet::utxo::Utxo;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A signature made outside the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSignature {
    /// DER signature without the sighash byte
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub signature: Vec<u8>,

    /// Public key that created this signature
    #[serde(with = "crate::serde_bytes::hex_vec")]
    pub public_key: Vec<u8>,

    /// Input the signature is for, checked when present
    #[serde(default)]
    pub input_index: Option<usize>,
}

impl ExternalSignature {
    pub fn new(signature: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self {
            signature,
            public_key,
            input_index: None,
        }
    }

    pub fn with_input_index(mut self, index: usize) -> Self {
        self.input_index = Some(index);
        self
    }
}

/// Hands out queued signatures in walk order
pub struct ExternalSignatureProvider {
    queue: VecDeque<ExternalSignature>,
    verify: bool,
}

impl ExternalSignatureProvider {
    pub fn new(signatures: Vec<ExternalSignature>, verify: bool) -> Self {
        Self {
            queue: signatures.into(),
            verify,
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn next_for(&mut self, request: &SignatureRequest<'_>) -> SignerResult<ExternalSignature> {
        self.queue.pop_front().ok_or_else(|| {
            SignerError::new(
                ErrorCode::InvalidSignatureCount,
                format!("Ran out of signatures at input {}", request.input_index),
            )
        })
    }
}

impl SignatureProvider for ExternalSignatureProvider {
    fn provide(&mut self, request: SignatureRequest<'_>) -> SignerResult<Option<ProvidedSignature>> {
        let supplied = match request.signer {
            SignerRef::MultisigKey(key) => {
                // Absent multisig signers are allowed; only take a signature
                // made by this key
                if !self.queue.front().is_some_and(|next| next.public_key == key) {
                    return Ok(None);
                }
                self.next_for(&request)?
            }
            SignerRef::PublicKeyHash(hash) => {
                let next = self.next_for(&request)?;
                if hash160(&next.public_key) != *hash {
                    return Err(key_mismatch(request.input_index));
                }
                next
            }
            SignerRef::PublicKey(key) => {
                let next = self.next_for(&request)?;
                if next.public_key != key {
                    return Err(key_mismatch(request.input_index));
                }
                next
            }
        };

        if supplied.signature.is_empty() {
            return Err(SignerError::signing_failed(format!(
                "Empty signature supplied for input {}",
                request.input_index
            )));
        }

        if let Some(index) = supplied.input_index {
            if index != request.input_index {
                return Err(SignerError::invalid_input(format!(
                    "Signature for input {} supplied at input {}",
                    index, request.input_index
                )));
            }
        }

        if self.verify {
            verify(&request.digest, &supplied.signature, &supplied.public_key).map_err(|e| {
                SignerError::new(
                    ErrorCode::SignatureVerificationFailed,
                    format!("Signature for input {} does not verify", request.input_index),
                )
                .with_details(e.message)
            })?;
        }

        let mut signature = supplied.signature;
        signature.push(request.hash_type.byte());
        Ok(Some(ProvidedSignature {
            signature,
            public_key: supplied.public_key,
        }))
    }
}

fn key_mismatch(index: usize) -> SignerError {
    SignerError::new(
        ErrorCode::InvalidPublicKey,
        format!("Public key for input {} does not match its script", index),
    )
}

/// Assemble `unsigned` with external signatures. Every supplied signature
/// must be consumed.
pub fn compile_transaction(
    unsigned: &Transaction,
    utxos: &[Utxo],
    scripts: &HashMap<String, Script>,
    hash_type: SigHashType,
    signatures: Vec<ExternalSignature>,
    verify_signatures: bool,
) -> SignerResult<Transaction> {
    let supplied = signatures.len();
    let mut provider = ExternalSignatureProvider::new(signatures, verify_signatures);

    let signed = TransactionSigner::new(unsigned, utxos, scripts, hash_type).sign(&mut provider)?;

    if provider.remaining() > 0 {
        return Err(SignerError::new(
            ErrorCode::InvalidSignatureCount,
            format!("{} of {} signatures were not used", provider.remaining(), supplied),
        ));
    }

    Ok(signed)
}
