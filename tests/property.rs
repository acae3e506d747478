use std::collections::HashMap;

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::SecretKey;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, ScriptBuf, Sequence, TxIn, TxOut, Txid, Witness};
use proptest::prelude::*;
use utxo_signer::fees::FeeCalculator;
use utxo_signer::script::{Script, ScriptPattern};
use utxo_signer::signing::{collect_pre_image_hashes, compile_transaction, ExternalSignature, SigningAlgorithm};
use utxo_signer::tx::{
    sign_transaction, HashAlgorithm, OutPoint, SigHashType, SignatureVersion, Transaction, TransactionInput,
    TransactionOutput,
};
use utxo_signer::utils::crypto::hash160;
use utxo_signer::wallet::keys::{sign, KeyStore, PrivateKey};
use utxo_signer::wallet::utxo::{select_utxos, SelectionParams, Utxo};

const SIGHASH_TYPES: [SigHashType; 6] = [
    SigHashType::ALL,
    SigHashType::NONE,
    SigHashType::SINGLE,
    SigHashType::ALL_ANYONE_CAN_PAY,
    SigHashType::NONE_ANYONE_CAN_PAY,
    SigHashType::SINGLE_ANYONE_CAN_PAY,
];

fn any_secret_key() -> impl Strategy<Value = SecretKey> {
    prop::array::uniform32(any::<u8>()).prop_filter_map("valid secp256k1 scalar", |bytes| {
        SecretKey::from_slice(&bytes).ok()
    })
}

fn any_sighash_type() -> impl Strategy<Value = SigHashType> {
    (0..SIGHASH_TYPES.len()).prop_map(|i| SIGHASH_TYPES[i])
}

prop_compose! {
    fn any_transaction()(
        version in 1i32..=2,
        lock_time in any::<u32>(),
        inputs in prop::collection::vec(
            (prop::array::uniform32(any::<u8>()), any::<u32>(), any::<u32>()),
            1..5,
        ),
        outputs in prop::collection::vec(
            (0u64..2_100_000_000_000_000, prop::array::uniform20(any::<u8>())),
            1..5,
        ),
    ) -> Transaction {
        let mut tx = Transaction::new(version, lock_time, HashAlgorithm::Sha256d, None);
        for (hash, index, sequence) in inputs {
            tx.inputs.push(TransactionInput::new(OutPoint::new(hash, index), sequence));
        }
        for (value, hash) in outputs {
            tx.outputs.push(TransactionOutput::new(value, Script::pay_to_public_key_hash(&hash)));
        }
        tx
    }
}

fn to_bitcoin(tx: &Transaction) -> bitcoin::Transaction {
    bitcoin::Transaction {
        version: Version(tx.version),
        lock_time: LockTime::from_consensus(tx.lock_time),
        input: tx
            .inputs
            .iter()
            .map(|input| TxIn {
                previous_output: bitcoin::OutPoint {
                    txid: Txid::from_byte_array(input.previous_output.hash),
                    vout: input.previous_output.index,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence(input.sequence),
                witness: Witness::new(),
            })
            .collect(),
        output: tx
            .outputs
            .iter()
            .map(|output| TxOut {
                value: Amount::from_sat(output.value),
                script_pubkey: ScriptBuf::from_bytes(output.script.as_bytes().to_vec()),
            })
            .collect(),
    }
}

proptest! {
    #[test]
    fn legacy_digest_matches_reference(
        tx in any_transaction(),
        index_seed in any::<usize>(),
        hash_type in any_sighash_type(),
        code_hash in prop::array::uniform20(any::<u8>()),
    ) {
        let index = index_seed % tx.inputs.len();
        let script_code = Script::pay_to_public_key_hash(&code_hash);

        let ours = tx
            .signature_hash(&script_code, index, hash_type, 0, SignatureVersion::Base)
            .unwrap();

        let reference_tx = to_bitcoin(&tx);
        let cache = SighashCache::new(&reference_tx);
        let reference = cache
            .legacy_signature_hash(index, &ScriptBuf::from_bytes(script_code.as_bytes().to_vec()), hash_type.raw())
            .unwrap();

        prop_assert_eq!(ours, reference.to_byte_array());
    }

    #[test]
    fn witness_digest_matches_reference(
        tx in any_transaction(),
        index_seed in any::<usize>(),
        hash_type in any_sighash_type(),
        amount in 0u64..2_100_000_000_000_000,
        code_hash in prop::array::uniform20(any::<u8>()),
    ) {
        let index = index_seed % tx.inputs.len();
        let script_code = Script::pay_to_public_key_hash(&code_hash);

        let ours = tx
            .signature_hash(&script_code, index, hash_type, amount, SignatureVersion::WitnessV0)
            .unwrap();

        let reference_tx = to_bitcoin(&tx);
        let mut cache = SighashCache::new(&reference_tx);
        let reference = cache
            .p2wsh_signature_hash(
                index,
                &ScriptBuf::from_bytes(script_code.as_bytes().to_vec()),
                Amount::from_sat(amount),
                EcdsaSighashType::from_consensus(hash_type.raw()),
            )
            .unwrap();

        prop_assert_eq!(ours, reference.to_byte_array());
    }

    #[test]
    fn digests_are_pure_and_track_outputs(
        tx in any_transaction(),
        index_seed in any::<usize>(),
        version in prop_oneof![Just(SignatureVersion::Base), Just(SignatureVersion::WitnessV0)],
    ) {
        let index = index_seed % tx.inputs.len();
        let code = Script::pay_to_public_key_hash(&[0x5a; 20]);
        let all = tx.signature_hash(&code, index, SigHashType::ALL, 1000, version).unwrap();
        prop_assert_eq!(all, tx.signature_hash(&code, index, SigHashType::ALL, 1000, version).unwrap());

        // Changing any output changes ALL
        let mut changed = tx.clone();
        let last = changed.outputs.len() - 1;
        changed.outputs[last].value ^= 1;
        prop_assert_ne!(all, changed.signature_hash(&code, index, SigHashType::ALL, 1000, version).unwrap());

        // Changing outputs other than the signed index leaves SINGLE alone
        if index < tx.outputs.len() {
            let single = tx.signature_hash(&code, index, SigHashType::SINGLE, 1000, version).unwrap();
            let mut other = tx.clone();
            for (i, output) in other.outputs.iter_mut().enumerate() {
                if i != index {
                    output.script = Script::pay_to_public_key_hash(&[0xee; 20]);
                }
            }
            other.outputs.push(TransactionOutput::new(1, Script::pay_to_public_key_hash(&[1; 20])));
            prop_assert_eq!(single, other.signature_hash(&code, index, SigHashType::SINGLE, 1000, version).unwrap());
        }
    }

    #[test]
    fn selection_balances(
        amounts in prop::collection::vec(1_000u64..1_000_000, 1..20),
        target in 1u64..2_000_000,
        byte_fee in 1u64..20,
        dust_threshold in 0u64..5_000,
    ) {
        let utxos: Vec<Utxo> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                Utxo::new(OutPoint::new([i as u8; 32], i as u32), Script::pay_to_public_key_hash(&[7; 20]), *amount)
            })
            .collect();
        let params = SelectionParams {
            target,
            extra_outputs_amount: 0,
            extra_output_count: 0,
            byte_fee,
            dust_threshold,
            max_utxos: 3000,
            use_max_amount: false,
            use_max_utxo: false,
            disable_dust_filter: false,
            has_op_return: false,
        };

        if let Ok(plan) = select_utxos(&utxos, &params, &FeeCalculator::default()) {
            let selected: u64 = plan.utxos.iter().map(|u| u.amount).sum();
            prop_assert_eq!(selected, plan.amount + plan.fee + plan.change);
            prop_assert_eq!(plan.amount, target);
            prop_assert!(plan.is_balanced());
            prop_assert!(plan.change == 0 || plan.change >= dust_threshold);
            prop_assert!(plan.utxos.iter().all(|u| u.amount >= dust_threshold));
        }
    }

    #[test]
    fn max_amount_spends_every_eligible_utxo(
        amounts in prop::collection::vec(10_000u64..1_000_000, 1..10),
        byte_fee in 1u64..10,
    ) {
        let utxos: Vec<Utxo> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| Utxo::new(OutPoint::new([i as u8; 32], 0), Script::default(), *amount))
            .collect();
        let params = SelectionParams {
            target: 0,
            extra_outputs_amount: 0,
            extra_output_count: 0,
            byte_fee,
            dust_threshold: 546,
            max_utxos: 3000,
            use_max_amount: true,
            use_max_utxo: false,
            disable_dust_filter: false,
            has_op_return: false,
        };

        let plan = select_utxos(&utxos, &params, &FeeCalculator::default()).unwrap();
        let total: u64 = amounts.iter().sum();
        prop_assert_eq!(plan.utxos.len(), amounts.len());
        prop_assert_eq!(plan.amount, total - plan.fee);
        prop_assert_eq!(plan.change, 0);
    }

    #[test]
    fn standard_scripts_classify_and_rebuild(
        hash20 in prop::array::uniform20(any::<u8>()),
        hash32 in prop::array::uniform32(any::<u8>()),
        required in 1usize..=3,
        key_count in 3usize..=5,
        key_body in prop::array::uniform32(any::<u8>()),
    ) {
        let keys: Vec<Vec<u8>> = (0..key_count)
            .map(|i| {
                let mut key = vec![0x02 + (i % 2) as u8];
                key.extend_from_slice(&key_body);
                key[1] = i as u8;
                key
            })
            .collect();

        let scripts = vec![
            Script::pay_to_public_key_hash(&hash20),
            Script::pay_to_script_hash(&hash20),
            Script::pay_to_witness_public_key_hash(&hash20),
            Script::pay_to_witness_script_hash(&hash32),
            Script::pay_to_public_key(&keys[0]),
            Script::multisig(required, &keys).unwrap(),
            Script::op_return(&hash32),
        ];

        for script in scripts {
            let pattern = script.classify();
            prop_assert_ne!(&pattern, &ScriptPattern::NonStandard);
            prop_assert_eq!(pattern.to_script(), Some(script));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn compile_reproduces_local_signing(
        secret in any_secret_key(),
        amounts in prop::collection::vec(1_000u64..1_000_000, 1..4),
        hash_type in any_sighash_type(),
    ) {
        let key = PrivateKey::from_slice(&secret.secret_bytes()).unwrap();
        let public = key.public_key(true).unwrap();
        let key_hash = hash160(&public);

        let utxos: Vec<Utxo> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                let script = if i % 2 == 0 {
                    Script::pay_to_public_key_hash(&key_hash)
                } else {
                    Script::pay_to_witness_public_key_hash(&key_hash)
                };
                Utxo::new(OutPoint::new([i as u8 + 1; 32], i as u32), script, *amount)
            })
            .collect();

        let mut tx = Transaction::new(2, 0, HashAlgorithm::Sha256d, None);
        for utxo in &utxos {
            tx.inputs.push(TransactionInput::new(utxo.outpoint, utxo.sequence()));
        }
        tx.outputs.push(TransactionOutput::new(500, Script::pay_to_public_key_hash(&[3; 20])));

        let scripts = HashMap::new();
        let signatures: Vec<ExternalSignature> = collect_pre_image_hashes(&tx, &utxos, &scripts, hash_type)
            .unwrap()
            .iter()
            .map(|h| ExternalSignature::new(sign(&h.hash, key.as_bytes(), SigningAlgorithm::Secp256k1Ecdsa), public.clone()))
            .collect();

        let compiled = compile_transaction(&tx, &utxos, &scripts, hash_type, signatures, true).unwrap();
        let store = KeyStore::new(&[key]).unwrap();
        let signed = sign_transaction(&tx, &utxos, &scripts, hash_type, &store).unwrap();

        prop_assert_eq!(compiled.encoded(), signed.encoded());
    }
}
