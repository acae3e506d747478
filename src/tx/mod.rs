//! Transaction Module
//!
//! The UTXO transaction model, its wire encoding, and the build and sign
//! stages of the pipeline.

mod builder;
mod sighash;
mod signer;

pub use builder::*;
pub use sighash::*;
pub use signer::*;

use crate::script::Script;
use serde::{Deserialize, Serialize};

/// Default input sequence (final, no relative lock time)
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

// =============================================================================
// Types
// =============================================================================

/// Reference to a previous transaction output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Previous transaction id, internal byte order
    #[serde(with = "crate::serde_bytes::txid")]
    pub hash: [u8; 32],
    pub index: u32,
}

impl OutPoint {
    pub fn new(hash: [u8; 32], index: u32) -> Self {
        Self { hash, index }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.hash);
        out.extend_from_slice(&self.index.to_le_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub previous_output: OutPoint,
    /// Claiming script; empty until signed
    #[serde(default)]
    pub script: Script,
    pub sequence: u32,
    #[serde(default, with = "crate::serde_bytes::hex_vec_list")]
    pub witness: Vec<Vec<u8>>,
}

impl TransactionInput {
    pub fn new(previous_output: OutPoint, sequence: u32) -> Self {
        Self {
            previous_output,
            script: Script::default(),
            sequence,
            witness: Vec::new(),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        self.previous_output.encode(out);
        encode_script(&self.script, out);
        out.extend_from_slice(&self.sequence.to_le_bytes());
    }

    fn encode_witness(&self, out: &mut Vec<u8>) {
        write_var_int(self.witness.len() as u64, out);
        for item in &self.witness {
            write_var_int(item.len() as u64, out);
            out.extend_from_slice(item);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    pub script: Script,
}

impl TransactionOutput {
    pub fn new(value: u64, script: Script) -> Self {
        Self { value, script }
    }

    /// Placeholder committed for skipped outputs in legacy SINGLE digests:
    /// value -1 and an empty script
    pub fn null() -> Self {
        Self {
            value: u64::MAX,
            script: Script::default(),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        encode_script(&self.script, out);
    }
}

/// A UTXO-model transaction plus the chain's hashing parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    /// Replay-protection fork id (forces witness-style digests)
    #[serde(default)]
    pub fork_id: Option<u32>,
}

impl Transaction {
    pub fn new(version: i32, lock_time: u32, hash_algorithm: HashAlgorithm, fork_id: Option<u32>) -> Self {
        Self {
            version,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time,
            hash_algorithm,
            fork_id,
        }
    }

    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Wire encoding; the segwit marker, flag and witnesses are written only
    /// when `with_witness` is set
    pub fn encode(&self, with_witness: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(10 + self.inputs.len() * 150 + self.outputs.len() * 34);

        out.extend_from_slice(&self.version.to_le_bytes());

        if with_witness {
            out.push(0x00); // marker
            out.push(0x01); // flag
        }

        write_var_int(self.inputs.len() as u64, &mut out);
        for input in &self.inputs {
            input.encode(&mut out);
        }

        write_var_int(self.outputs.len() as u64, &mut out);
        for output in &self.outputs {
            output.encode(&mut out);
        }

        if with_witness {
            for input in &self.inputs {
                input.encode_witness(&mut out);
            }
        }

        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Encoding used for broadcast: witness form only when a witness exists
    pub fn encoded(&self) -> Vec<u8> {
        self.encode(self.has_witness())
    }

    /// Transaction id in internal byte order (hash of the non-witness form)
    pub fn txid(&self) -> [u8; 32] {
        self.hash_algorithm.hash(&self.encode(false))
    }

    /// Transaction id as explorers display it
    pub fn txid_hex(&self) -> String {
        let mut id = self.txid();
        id.reverse();
        hex::encode(id)
    }

    /// Virtual size in vbytes
    pub fn vsize(&self) -> usize {
        let base_size = self.encode(false).len();
        let total_size = self.encoded().len();
        (base_size * 3 + total_size + 3) / 4
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

// =============================================================================
// Encoding helpers
// =============================================================================

/// Bitcoin CompactSize integer
pub fn write_var_int(n: u64, out: &mut Vec<u8>) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

pub(crate) fn encode_script(script: &Script, out: &mut Vec<u8>) {
    write_var_int(script.len() as u64, out);
    out.extend_from_slice(script.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        let mut tx = Transaction::new(1, 0, HashAlgorithm::Sha256d, None);
        tx.inputs.push(TransactionInput::new(OutPoint::new([0x11; 32], 1), SEQUENCE_FINAL));
        tx.outputs.push(TransactionOutput::new(
            50_000,
            Script::pay_to_public_key_hash(&[0x22; 20]),
        ));
        tx
    }

    #[test]
    fn test_var_int_boundaries() {
        let cases: [(u64, &str); 5] = [
            (0xfc, "fc"),
            (0xfd, "fdfd00"),
            (0xffff, "fdffff"),
            (0x1_0000, "fe00000100"),
            (0x1_0000_0000, "ff0000000001000000"),
        ];
        for (n, expected) in cases {
            let mut out = Vec::new();
            write_var_int(n, &mut out);
            assert_eq!(hex::encode(out), expected);
        }
    }

    #[test]
    fn test_legacy_encoding_layout() {
        let tx = sample_tx();
        let raw = tx.encoded();
        // version + 1 input (32 + 4 + 1 + 4) + 1 output (8 + 1 + 25) + counts + lock time
        assert_eq!(raw.len(), 4 + 1 + 41 + 1 + 34 + 4);
        assert_eq!(&raw[..5], &[1, 0, 0, 0, 1]);
        assert_eq!(tx.vsize(), raw.len());
    }

    #[test]
    fn test_witness_encoding_keeps_txid_stable() {
        let mut tx = sample_tx();
        let txid_before = tx.txid();

        tx.inputs[0].witness = vec![vec![0x30; 71], vec![0x02; 33]];
        assert!(tx.has_witness());

        let raw = tx.encoded();
        assert_eq!(&raw[4..6], &[0x00, 0x01]);
        assert_eq!(tx.txid(), txid_before);
        assert!(tx.vsize() < raw.len());
    }

    #[test]
    fn test_null_output_encodes_minus_one() {
        let mut out = Vec::new();
        TransactionOutput::null().encode(&mut out);
        assert_eq!(hex::encode(out), "ffffffffffffffff00");
    }
}
