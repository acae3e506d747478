//! Transaction Signer
//!
//! Resolves each input's locking script into the items that satisfy it,
//! requests signatures over the right digest and writes the resulting
//! scriptSig and witness into a copy of the unsigned transaction.
//!
//! Where signatures come from is abstracted by [`SignatureProvider`]: local
//! keys, an externally supplied queue, or a recorder that only collects the
//! digests.

use super::{HashAlgorithm, SigHashType, SignatureVersion, Transaction};
use crate::error::{SignerError, SignerResult};
use crate::script::{push_all, remove_code_separators, Script, ScriptPattern};
use crate::types::Chain;
use crate::utils::crypto::{hash160, sha256};
use crate::wallet::keys::{sign_with_key, KeyStore, PrivateKey};
use crate::wallet::utxo::{TransactionPlan, Utxo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Input / Output
// =============================================================================

/// Additional payment appended after the main, change and data outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraOutput {
    pub address: String,
    pub amount: u64,
}

/// Everything needed to plan, build and sign one spend
#[derive(Debug, Clone, Deserialize)]
pub struct SigningInput {
    pub chain: Chain,
    #[serde(default)]
    pub hash_type: SigHashType,
    #[serde(default)]
    pub amount: u64,
    /// Fee per byte
    #[serde(default)]
    pub byte_fee: u64,
    pub to_address: String,
    #[serde(default)]
    pub change_address: String,
    #[serde(default)]
    pub private_keys: Vec<PrivateKey>,
    /// Redeem and witness scripts keyed by the hex of their hash
    #[serde(default)]
    pub scripts: HashMap<String, Script>,
    #[serde(default)]
    pub utxos: Vec<Utxo>,
    #[serde(default)]
    pub use_max_amount: bool,
    #[serde(default)]
    pub use_max_utxo: bool,
    #[serde(default)]
    pub disable_dust_filter: bool,
    #[serde(default)]
    pub extra_outputs: Vec<ExtraOutput>,
    #[serde(default, with = "crate::serde_bytes::hex_vec")]
    pub output_op_return: Vec<u8>,
    #[serde(default)]
    pub lock_time: u32,
    /// Use this plan instead of running input selection
    #[serde(default)]
    pub plan: Option<TransactionPlan>,
    /// Override the chain's digest hash
    #[serde(default)]
    pub hash_algorithm: Option<HashAlgorithm>,
}

impl SigningInput {
    pub fn new(chain: Chain, to_address: impl Into<String>, amount: u64) -> Self {
        Self {
            chain,
            hash_type: SigHashType::ALL,
            amount,
            byte_fee: 0,
            to_address: to_address.into(),
            change_address: String::new(),
            private_keys: Vec::new(),
            scripts: HashMap::new(),
            utxos: Vec::new(),
            use_max_amount: false,
            use_max_utxo: false,
            disable_dust_filter: false,
            extra_outputs: Vec::new(),
            output_op_return: Vec::new(),
            lock_time: 0,
            plan: None,
            hash_algorithm: None,
        }
    }

    pub fn extra_outputs_amount(&self) -> u64 {
        self.extra_outputs
            .iter()
            .fold(0u64, |acc, out| acc.saturating_add(out.amount))
    }
}

/// A signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningOutput {
    pub transaction: Transaction,
    /// Wire encoding in hex
    pub encoded: String,
    /// Display-order txid
    pub transaction_id: String,
    pub vsize: usize,
    pub fee: u64,
}

impl SigningOutput {
    pub fn new(transaction: Transaction, fee: u64) -> Self {
        Self {
            encoded: hex::encode(transaction.encoded()),
            transaction_id: transaction.txid_hex(),
            vsize: transaction.vsize(),
            fee,
            transaction,
        }
    }
}

// =============================================================================
// Signature providers
// =============================================================================

/// The key a script asks to sign with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerRef<'a> {
    /// P2PKH and P2WPKH: only the key hash is known
    PublicKeyHash(&'a [u8; 20]),
    /// P2PK
    PublicKey(&'a [u8]),
    /// One key of a multisig script; a missing signature is allowed
    MultisigKey(&'a [u8]),
}

/// One signature the signer needs
#[derive(Debug, Clone, Copy)]
pub struct SignatureRequest<'a> {
    pub input_index: usize,
    pub digest: [u8; 32],
    pub signer: SignerRef<'a>,
    pub hash_type: SigHashType,
}

/// A signature with its sighash byte appended, and the key that made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedSignature {
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
}

/// Source of signatures for the resolution walk.
///
/// `Ok(None)` means no signature is available for that signer.
pub trait SignatureProvider {
    fn provide(&mut self, request: SignatureRequest<'_>) -> SignerResult<Option<ProvidedSignature>>;
}

/// Signs with locally held private keys
pub struct KeyStoreProvider<'a> {
    keys: &'a KeyStore,
}

impl<'a> KeyStoreProvider<'a> {
    pub fn new(keys: &'a KeyStore) -> Self {
        Self { keys }
    }
}

impl SignatureProvider for KeyStoreProvider<'_> {
    fn provide(&mut self, request: SignatureRequest<'_>) -> SignerResult<Option<ProvidedSignature>> {
        let (key, public_key) = match request.signer {
            SignerRef::PublicKeyHash(hash) => match self.keys.find_by_public_key_hash(hash) {
                Some((key, public_key)) => (key, public_key.to_vec()),
                None => return Ok(None),
            },
            SignerRef::PublicKey(public_key) | SignerRef::MultisigKey(public_key) => {
                match self.keys.find_by_public_key(public_key) {
                    Some(key) => (key, public_key.to_vec()),
                    None => return Ok(None),
                }
            }
        };

        let mut signature = sign_with_key(key, &request.digest)?;
        signature.push(request.hash_type.byte());
        Ok(Some(ProvidedSignature { signature, public_key }))
    }
}

// =============================================================================
// Resolution walk
// =============================================================================

/// Claiming data produced for one input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct InputClaim {
    script_sig: Script,
    witness: Vec<Vec<u8>>,
}

/// Signs an unsigned transaction built from a plan
pub struct TransactionSigner<'a> {
    unsigned: &'a Transaction,
    utxos: &'a [Utxo],
    scripts: &'a HashMap<String, Script>,
    hash_type: SigHashType,
}

impl<'a> TransactionSigner<'a> {
    /// `utxos` must be in input order, as the builder lays them out
    pub fn new(
        unsigned: &'a Transaction,
        utxos: &'a [Utxo],
        scripts: &'a HashMap<String, Script>,
        hash_type: SigHashType,
    ) -> Self {
        Self {
            unsigned,
            utxos,
            scripts,
            hash_type,
        }
    }

    /// Walk every input. Digests are always taken over the unsigned
    /// transaction; claims are written into a copy.
    pub fn sign<P: SignatureProvider>(&self, provider: &mut P) -> SignerResult<Transaction> {
        if self.utxos.len() != self.unsigned.inputs.len() {
            return Err(SignerError::internal(format!(
                "{} UTXOs for {} inputs",
                self.utxos.len(),
                self.unsigned.inputs.len()
            )));
        }

        let mut signed = self.unsigned.clone();

        for index in 0..self.unsigned.inputs.len() {
            if self.hash_type.is_single() && index >= self.unsigned.outputs.len() {
                crate::log_debug!("signer", "Input has no matching output under SINGLE, left unsigned", input = index);
                continue;
            }

            let claim = self.sign_input(index, provider)?;
            let input = &mut signed.inputs[index];
            input.script = claim.script_sig;
            input.witness = claim.witness;
        }

        Ok(signed)
    }

    fn base_version(&self) -> SignatureVersion {
        if self.unsigned.fork_id.is_some() {
            SignatureVersion::WitnessV0
        } else {
            SignatureVersion::Base
        }
    }

    fn sign_input<P: SignatureProvider>(&self, index: usize, provider: &mut P) -> SignerResult<InputClaim> {
        let utxo = &self.utxos[index];

        match utxo.script.classify() {
            ScriptPattern::PayToScriptHash(hash) => {
                let redeem = self.lookup_script(&hash)?;

                match redeem.classify() {
                    ScriptPattern::PayToWitnessPublicKeyHash(key_hash) => Ok(InputClaim {
                        witness: self.sign_witness_key_hash(index, &key_hash, utxo.amount, provider)?,
                        script_sig: push_all(&[redeem.clone().into_bytes()]),
                    }),
                    ScriptPattern::PayToWitnessScriptHash(script_hash) => Ok(InputClaim {
                        witness: self.sign_witness_script_hash(index, &script_hash, utxo.amount, provider)?,
                        script_sig: push_all(&[redeem.clone().into_bytes()]),
                    }),
                    _ => {
                        let mut items = self.sign_step(redeem, index, utxo.amount, self.base_version(), provider)?;
                        items.push(redeem.clone().into_bytes());
                        Ok(InputClaim {
                            script_sig: push_all(&items),
                            witness: Vec::new(),
                        })
                    }
                }
            }
            ScriptPattern::PayToWitnessPublicKeyHash(key_hash) => Ok(InputClaim {
                script_sig: Script::default(),
                witness: self.sign_witness_key_hash(index, &key_hash, utxo.amount, provider)?,
            }),
            ScriptPattern::PayToWitnessScriptHash(script_hash) => Ok(InputClaim {
                script_sig: Script::default(),
                witness: self.sign_witness_script_hash(index, &script_hash, utxo.amount, provider)?,
            }),
            _ => {
                let items = self.sign_step(&utxo.script, index, utxo.amount, self.base_version(), provider)?;
                Ok(InputClaim {
                    script_sig: push_all(&items),
                    witness: Vec::new(),
                })
            }
        }
    }

    fn sign_witness_key_hash<P: SignatureProvider>(
        &self,
        index: usize,
        key_hash: &[u8; 20],
        amount: u64,
        provider: &mut P,
    ) -> SignerResult<Vec<Vec<u8>>> {
        let script_code = Script::pay_to_public_key_hash(key_hash);
        self.sign_step(&script_code, index, amount, SignatureVersion::WitnessV0, provider)
    }

    fn sign_witness_script_hash<P: SignatureProvider>(
        &self,
        index: usize,
        script_hash: &[u8; 32],
        amount: u64,
        provider: &mut P,
    ) -> SignerResult<Vec<Vec<u8>>> {
        let witness_script = self.lookup_script(script_hash)?;
        let mut items = self.sign_step(witness_script, index, amount, SignatureVersion::WitnessV0, provider)?;
        items.push(witness_script.clone().into_bytes());
        Ok(items)
    }

    fn lookup_script(&self, hash: &[u8]) -> SignerResult<&'a Script> {
        let key = hex::encode(hash);
        self.scripts
            .get(&key)
            .ok_or_else(|| SignerError::missing_redeem_script(&key))
    }

    /// Signature items for a script that is satisfied directly by keys
    fn sign_step<P: SignatureProvider>(
        &self,
        script: &Script,
        index: usize,
        amount: u64,
        version: SignatureVersion,
        provider: &mut P,
    ) -> SignerResult<Vec<Vec<u8>>> {
        let pattern = script.classify();
        if !matches!(
            pattern,
            ScriptPattern::PayToPublicKeyHash(_) | ScriptPattern::PayToPublicKey(_) | ScriptPattern::Multisig { .. }
        ) {
            return Err(SignerError::invalid_output_script(format!(
                "Input {} is locked by an unsupported {} script",
                index,
                pattern.name()
            )));
        }

        let digest = self.digest(script, index, amount, version)?;
        let request = |signer| SignatureRequest {
            input_index: index,
            digest,
            signer,
            hash_type: self.hash_type,
        };

        match &pattern {
            ScriptPattern::PayToPublicKeyHash(key_hash) => {
                let provided = provider
                    .provide(request(SignerRef::PublicKeyHash(key_hash)))?
                    .ok_or_else(|| missing_key(index, &hex::encode(key_hash)))?;
                Ok(vec![provided.signature, provided.public_key])
            }
            ScriptPattern::PayToPublicKey(public_key) => {
                let provided = provider
                    .provide(request(SignerRef::PublicKey(public_key)))?
                    .ok_or_else(|| missing_key(index, &hex::encode(hash160(public_key))))?;
                Ok(vec![provided.signature])
            }
            ScriptPattern::Multisig { required, keys } => {
                // Leading empty item for the extra stack element CHECKMULTISIG
                // pops. Kept as a deliberate compatibility artifact.
                let mut items: Vec<Vec<u8>> = vec![Vec::new()];

                for key in keys {
                    if let Some(provided) = provider.provide(request(SignerRef::MultisigKey(key)))? {
                        items.push(provided.signature);
                    }
                }

                if items.len() < required + 1 {
                    return Err(SignerError::missing_private_key(format!(
                        "Input {} needs {} multisig signatures, found {}",
                        index,
                        required,
                        items.len() - 1
                    )));
                }
                items.truncate(required + 1);
                Ok(items)
            }
            _ => Err(SignerError::internal("Unreachable script pattern")),
        }
    }

    fn digest(&self, script: &Script, index: usize, amount: u64, version: SignatureVersion) -> SignerResult<[u8; 32]> {
        let script_code = match version {
            SignatureVersion::Base => remove_code_separators(script),
            SignatureVersion::WitnessV0 => script.clone(),
        };
        self.unsigned
            .signature_hash(&script_code, index, self.hash_type, amount, version)
    }
}

fn missing_key(index: usize, key_hash: &str) -> SignerError {
    SignerError::missing_private_key(format!("No private key for input {}", index))
        .with_details(format!("key hash {}", key_hash))
}

/// Hash a script is looked up by in the scripts map
pub fn script_lookup_key(script: &Script, witness: bool) -> String {
    if witness {
        hex::encode(sha256(script.as_bytes()))
    } else {
        hex::encode(hash160(script.as_bytes()))
    }
}

/// Sign with local keys
pub fn sign_transaction(
    unsigned: &Transaction,
    utxos: &[Utxo],
    scripts: &HashMap<String, Script>,
    hash_type: SigHashType,
    keys: &KeyStore,
) -> SignerResult<Transaction> {
    let mut provider = KeyStoreProvider::new(keys);
    TransactionSigner::new(unsigned, utxos, scripts, hash_type).sign(&mut provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::tx::{OutPoint, TransactionInput, TransactionOutput, SEQUENCE_FINAL};
    use crate::wallet::keys::verify;

    const KEY_A: &str = "693dfe6f3ed717573eb10c24ebe5eb592fa3c239245cd499c487eb7b8ea7ed3a";
    const KEY_B: &str = "0000000000000000000000000000000000000000000000000000000000000002";
    const KEY_C: &str = "0000000000000000000000000000000000000000000000000000000000000003";

    fn key(hex: &str) -> PrivateKey {
        PrivateKey::from_hex(hex).unwrap()
    }

    fn pubkey(hex: &str) -> Vec<u8> {
        key(hex).public_key(true).unwrap()
    }

    fn store(keys: &[&str]) -> KeyStore {
        let keys: Vec<PrivateKey> = keys.iter().map(|k| key(k)).collect();
        KeyStore::new(&keys).unwrap()
    }

    fn unsigned_for(utxos: &[Utxo], outputs: usize) -> Transaction {
        let mut tx = Transaction::new(1, 0, HashAlgorithm::Sha256d, None);
        for utxo in utxos {
            tx.inputs.push(TransactionInput::new(utxo.outpoint, utxo.sequence()));
        }
        for i in 0..outputs {
            tx.outputs.push(TransactionOutput::new(
                1000,
                Script::pay_to_public_key_hash(&[i as u8; 20]),
            ));
        }
        tx
    }

    fn utxo(script: Script, tag: u8) -> Utxo {
        Utxo::new(OutPoint::new([tag; 32], 0), script, 50_000)
    }

    /// Split a scriptSig made of direct pushes into its items
    fn push_items(script: &Script) -> Vec<Vec<u8>> {
        let bytes = script.as_bytes();
        let mut items = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let len = bytes[pos] as usize;
            assert!(len <= 0x4b, "unexpected opcode {:#04x}", bytes[pos]);
            items.push(bytes[pos + 1..pos + 1 + len].to_vec());
            pos += 1 + len;
        }
        items
    }

    fn assert_signed_by(tx: &Transaction, script: &Script, signature: &[u8], public: &[u8]) {
        let digest = tx
            .signature_hash(script, 0, SigHashType::ALL, 0, SignatureVersion::Base)
            .unwrap();
        assert_eq!(*signature.last().unwrap(), 0x01);
        assert!(verify(&digest, &signature[..signature.len() - 1], public).is_ok());
    }

    #[test]
    fn test_p2pkh_claim_verifies() {
        let public = pubkey(KEY_A);
        let utxos = vec![utxo(Script::pay_to_public_key_hash(&hash160(&public)), 1)];
        let tx = unsigned_for(&utxos, 1);

        let signed = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_A])).unwrap();

        let script_sig = signed.inputs[0].script.as_bytes();
        let sig_len = script_sig[0] as usize;
        let signature = &script_sig[1..1 + sig_len];
        assert_eq!(*signature.last().unwrap(), 0x01);
        assert_eq!(&script_sig[2 + sig_len..], public.as_slice());

        let digest = tx
            .signature_hash(&utxos[0].script, 0, SigHashType::ALL, 0, SignatureVersion::Base)
            .unwrap();
        assert!(verify(&digest, &signature[..sig_len - 1], &public).is_ok());
        assert!(signed.inputs[0].witness.is_empty());
    }

    #[test]
    fn test_missing_key() {
        let utxos = vec![utxo(Script::pay_to_public_key_hash(&[9u8; 20]), 1)];
        let tx = unsigned_for(&utxos, 1);
        let err = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_A])).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingPrivateKey);
    }

    #[test]
    fn test_missing_redeem_script() {
        let utxos = vec![utxo(Script::pay_to_script_hash(&[7u8; 20]), 1)];
        let tx = unsigned_for(&utxos, 1);
        let err = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_A])).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRedeemScript);
    }

    #[test]
    fn test_non_standard_script_rejected() {
        let utxos = vec![utxo(Script::new(vec![0x51]), 1)];
        let tx = unsigned_for(&utxos, 1);
        let err = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_A])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOutputScript);
    }

    #[test]
    fn test_two_of_three_with_one_key_fails() {
        let keys = vec![pubkey(KEY_A), pubkey(KEY_B), pubkey(KEY_C)];
        let redeem = Script::multisig(2, &keys).unwrap();
        let mut scripts = HashMap::new();
        scripts.insert(script_lookup_key(&redeem, false), redeem.clone());

        let utxos = vec![utxo(Script::pay_to_script_hash(&hash160(redeem.as_bytes())), 1)];
        let tx = unsigned_for(&utxos, 1);

        let err = sign_transaction(&tx, &utxos, &scripts, SigHashType::ALL, &store(&[KEY_A])).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingPrivateKey);

        let signed = sign_transaction(&tx, &utxos, &scripts, SigHashType::ALL, &store(&[KEY_A, KEY_C])).unwrap();
        let script_sig = signed.inputs[0].script.as_bytes();
        assert_eq!(script_sig[0], crate::script::opcodes::OP_0);
        assert!(script_sig.ends_with(redeem.as_bytes()));
    }

    #[test]
    fn test_bare_two_of_three_multisig() {
        let keys = vec![pubkey(KEY_A), pubkey(KEY_B), pubkey(KEY_C)];
        let locking = Script::multisig(2, &keys).unwrap();
        let utxos = vec![utxo(locking.clone(), 1)];
        let tx = unsigned_for(&utxos, 1);

        let err = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_B])).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingPrivateKey);

        let signed =
            sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_A, KEY_C])).unwrap();
        let items = push_items(&signed.inputs[0].script);
        assert_eq!(items.len(), 3);
        assert!(items[0].is_empty());
        assert_signed_by(&tx, &locking, &items[1], &keys[0]);
        assert_signed_by(&tx, &locking, &items[2], &keys[2]);
        assert!(signed.inputs[0].witness.is_empty());
    }

    #[test]
    fn test_p2pk_claim_is_signature_only() {
        let public = pubkey(KEY_A);
        let locking = Script::pay_to_public_key(&public);
        let utxos = vec![utxo(locking.clone(), 1)];
        let tx = unsigned_for(&utxos, 1);

        let signed = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_A])).unwrap();
        let items = push_items(&signed.inputs[0].script);
        assert_eq!(items.len(), 1);
        assert_signed_by(&tx, &locking, &items[0], &public);

        let err = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_B])).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingPrivateKey);
    }

    #[test]
    fn test_single_skips_inputs_without_output() {
        let public = pubkey(KEY_A);
        let script = Script::pay_to_public_key_hash(&hash160(&public));
        let utxos = vec![utxo(script.clone(), 1), utxo(script, 2)];
        let tx = unsigned_for(&utxos, 1);

        let signed = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::SINGLE, &store(&[KEY_A])).unwrap();
        assert!(!signed.inputs[0].script.is_empty());
        assert!(signed.inputs[1].script.is_empty());
    }

    #[test]
    fn test_p2wpkh_goes_to_witness() {
        let public = pubkey(KEY_A);
        let utxos = vec![utxo(Script::pay_to_witness_public_key_hash(&hash160(&public)), 1)];
        let tx = unsigned_for(&utxos, 1);

        let signed = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_A])).unwrap();
        let input = &signed.inputs[0];
        assert!(input.script.is_empty());
        assert_eq!(input.witness.len(), 2);
        assert_eq!(input.witness[1], public);

        let digest = tx
            .signature_hash(
                &Script::pay_to_public_key_hash(&hash160(&public)),
                0,
                SigHashType::ALL,
                50_000,
                SignatureVersion::WitnessV0,
            )
            .unwrap();
        let sig = &input.witness[0];
        assert!(verify(&digest, &sig[..sig.len() - 1], &public).is_ok());
        assert_eq!(signed.txid(), {
            let mut stripped = signed.clone();
            stripped.inputs[0].witness.clear();
            stripped.txid()
        });
    }

    #[test]
    fn test_nested_p2wpkh_in_p2sh() {
        let public = pubkey(KEY_A);
        let redeem = Script::pay_to_witness_public_key_hash(&hash160(&public));
        let mut scripts = HashMap::new();
        scripts.insert(script_lookup_key(&redeem, false), redeem.clone());

        let utxos = vec![utxo(Script::pay_to_script_hash(&hash160(redeem.as_bytes())), 1)];
        let tx = unsigned_for(&utxos, 1);

        let signed = sign_transaction(&tx, &utxos, &scripts, SigHashType::ALL, &store(&[KEY_A])).unwrap();
        let input = &signed.inputs[0];
        assert_eq!(input.script.as_bytes()[0] as usize, redeem.len());
        assert_eq!(&input.script.as_bytes()[1..], redeem.as_bytes());
        assert_eq!(input.witness.len(), 2);
    }

    #[test]
    fn test_p2wsh_multisig_appends_witness_script() {
        let keys = vec![pubkey(KEY_A), pubkey(KEY_B)];
        let witness_script = Script::multisig(1, &keys).unwrap();
        let mut scripts = HashMap::new();
        scripts.insert(script_lookup_key(&witness_script, true), witness_script.clone());

        let utxos = vec![utxo(
            Script::pay_to_witness_script_hash(&sha256(witness_script.as_bytes())),
            1,
        )];
        let tx = unsigned_for(&utxos, 1);

        let signed = sign_transaction(&tx, &utxos, &scripts, SigHashType::ALL, &store(&[KEY_B])).unwrap();
        let witness = &signed.inputs[0].witness;
        assert_eq!(witness.len(), 3);
        assert!(witness[0].is_empty());
        assert_eq!(witness[2], witness_script.into_bytes());
    }

    #[test]
    fn test_fork_id_uses_witness_digest() {
        let public = pubkey(KEY_A);
        let utxos = vec![utxo(Script::pay_to_public_key_hash(&hash160(&public)), 1)];
        let mut tx = unsigned_for(&utxos, 1);
        tx.fork_id = Some(0);
        let hash_type = SigHashType::ALL.with_fork_id();

        let signed = sign_transaction(&tx, &utxos, &HashMap::new(), hash_type, &store(&[KEY_A])).unwrap();
        let script_sig = signed.inputs[0].script.as_bytes();
        let sig_len = script_sig[0] as usize;
        let signature = &script_sig[1..1 + sig_len];
        assert_eq!(*signature.last().unwrap(), 0x41);

        let digest = tx
            .signature_hash(&utxos[0].script, 0, hash_type, 50_000, SignatureVersion::WitnessV0)
            .unwrap();
        assert!(verify(&digest, &signature[..sig_len - 1], &public).is_ok());
    }

    #[test]
    fn test_utxo_count_mismatch() {
        let utxos = vec![utxo(Script::pay_to_public_key_hash(&[1; 20]), 1)];
        let tx = unsigned_for(&[], 1);
        let err = sign_transaction(&tx, &utxos, &HashMap::new(), SigHashType::ALL, &store(&[KEY_A])).unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[test]
    fn test_sequence_defaults_to_final() {
        let u = utxo(Script::default(), 1);
        assert_eq!(u.sequence(), SEQUENCE_FINAL);
    }
}
