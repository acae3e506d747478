//! Script Matcher
//!
//! Classifies locking scripts into the closed set of standard patterns,
//! builds those patterns back from their parameters, and encodes the data
//! pushes used in claiming scripts.

pub mod opcodes;

use opcodes::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw script bytes. Classification is computed on demand, never cached.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script(#[serde(with = "crate::serde_bytes::hex_vec")] Vec<u8>);

/// A standard script pattern with the parameters signing needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptPattern {
    PayToPublicKeyHash([u8; 20]),
    PayToPublicKey(Vec<u8>),
    PayToScriptHash([u8; 20]),
    PayToWitnessPublicKeyHash([u8; 20]),
    PayToWitnessScriptHash([u8; 32]),
    /// Bare `m-of-n` multisig; keys in script order
    Multisig { required: usize, keys: Vec<Vec<u8>> },
    /// Data carrier; the pushed payload
    OpReturn(Vec<u8>),
    NonStandard,
}

impl ScriptPattern {
    /// Rebuild the script for a standard pattern
    pub fn to_script(&self) -> Option<Script> {
        let script = match self {
            ScriptPattern::PayToPublicKeyHash(hash) => Script::pay_to_public_key_hash(hash),
            ScriptPattern::PayToPublicKey(key) => Script::pay_to_public_key(key),
            ScriptPattern::PayToScriptHash(hash) => Script::pay_to_script_hash(hash),
            ScriptPattern::PayToWitnessPublicKeyHash(hash) => {
                Script::pay_to_witness_public_key_hash(hash)
            }
            ScriptPattern::PayToWitnessScriptHash(hash) => Script::pay_to_witness_script_hash(hash),
            ScriptPattern::Multisig { required, keys } => Script::multisig(*required, keys)?,
            ScriptPattern::OpReturn(data) => Script::op_return(data),
            ScriptPattern::NonStandard => return None,
        };
        Some(script)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScriptPattern::PayToPublicKeyHash(_) => "p2pkh",
            ScriptPattern::PayToPublicKey(_) => "p2pk",
            ScriptPattern::PayToScriptHash(_) => "p2sh",
            ScriptPattern::PayToWitnessPublicKeyHash(_) => "p2wpkh",
            ScriptPattern::PayToWitnessScriptHash(_) => "p2wsh",
            ScriptPattern::Multisig { .. } => "multisig",
            ScriptPattern::OpReturn(_) => "op_return",
            ScriptPattern::NonStandard => "non_standard",
        }
    }
}

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s.trim_start_matches("0x"))?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn pay_to_public_key_hash(hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
        bytes.extend_from_slice(hash);
        bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Self(bytes)
    }

    pub fn pay_to_script_hash(hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(23);
        bytes.extend_from_slice(&[OP_HASH160, 20]);
        bytes.extend_from_slice(hash);
        bytes.push(OP_EQUAL);
        Self(bytes)
    }

    pub fn pay_to_witness_public_key_hash(hash: &[u8; 20]) -> Self {
        let mut bytes = vec![OP_0, 20];
        bytes.extend_from_slice(hash);
        Self(bytes)
    }

    pub fn pay_to_witness_script_hash(hash: &[u8; 32]) -> Self {
        let mut bytes = vec![OP_0, 32];
        bytes.extend_from_slice(hash);
        Self(bytes)
    }

    pub fn pay_to_public_key(key: &[u8]) -> Self {
        let mut bytes = push_data(key);
        bytes.push(OP_CHECKSIG);
        Self(bytes)
    }

    /// `OP_m <keys...> OP_n OP_CHECKMULTISIG`. `None` when the counts
    /// cannot be expressed with small-integer opcodes or a key is not
    /// 33 or 65 bytes.
    pub fn multisig(required: usize, keys: &[Vec<u8>]) -> Option<Self> {
        if required == 0 || required > keys.len() || keys.len() > 16 {
            return None;
        }
        if keys.iter().any(|k| k.len() != 33 && k.len() != 65) {
            return None;
        }

        let mut bytes = vec![small_int_opcode(required)?];
        for key in keys {
            bytes.extend_from_slice(&push_data(key));
        }
        bytes.push(small_int_opcode(keys.len())?);
        bytes.push(OP_CHECKMULTISIG);
        Some(Self(bytes))
    }

    /// `OP_RETURN <push(data)>`
    pub fn op_return(data: &[u8]) -> Self {
        let mut bytes = vec![OP_RETURN];
        bytes.extend_from_slice(&push_data(data));
        Self(bytes)
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// Classify into a standard pattern. Total: every byte string maps to
    /// exactly one pattern or `NonStandard`.
    pub fn classify(&self) -> ScriptPattern {
        let b = self.0.as_slice();

        if let Some(hash) = self.match_pay_to_public_key_hash() {
            return ScriptPattern::PayToPublicKeyHash(hash);
        }
        if let Some(hash) = self.match_pay_to_script_hash() {
            return ScriptPattern::PayToScriptHash(hash);
        }
        if b.len() == 22 && b[0] == OP_0 && b[1] == 20 {
            return ScriptPattern::PayToWitnessPublicKeyHash(to_array(&b[2..]));
        }
        if b.len() == 34 && b[0] == OP_0 && b[1] == 32 {
            return ScriptPattern::PayToWitnessScriptHash(to_array(&b[2..]));
        }
        if let Some(key) = self.match_pay_to_public_key() {
            return ScriptPattern::PayToPublicKey(key);
        }
        if let Some((required, keys)) = self.match_multisig() {
            return ScriptPattern::Multisig { required, keys };
        }
        if let Some(data) = self.match_op_return() {
            return ScriptPattern::OpReturn(data);
        }

        ScriptPattern::NonStandard
    }

    pub fn match_pay_to_public_key_hash(&self) -> Option<[u8; 20]> {
        let b = self.0.as_slice();
        let matches = b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == 20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG;
        matches.then(|| to_array(&b[3..23]))
    }

    pub fn match_pay_to_script_hash(&self) -> Option<[u8; 20]> {
        let b = self.0.as_slice();
        let matches = b.len() == 23 && b[0] == OP_HASH160 && b[1] == 20 && b[22] == OP_EQUAL;
        matches.then(|| to_array(&b[2..22]))
    }

    /// Version-0 witness program (20 or 32 bytes)
    pub fn is_witness_program(&self) -> bool {
        matches!(
            self.classify(),
            ScriptPattern::PayToWitnessPublicKeyHash(_) | ScriptPattern::PayToWitnessScriptHash(_)
        )
    }

    fn match_pay_to_public_key(&self) -> Option<Vec<u8>> {
        let b = self.0.as_slice();
        let key = match b.len() {
            35 if b[0] == 33 && (b[1] == 0x02 || b[1] == 0x03) => &b[1..34],
            67 if b[0] == 65 && b[1] == 0x04 => &b[1..66],
            _ => return None,
        };
        (*b.last()? == OP_CHECKSIG).then(|| key.to_vec())
    }

    fn match_multisig(&self) -> Option<(usize, Vec<Vec<u8>>)> {
        let b = self.0.as_slice();
        if b.len() < 3 || *b.last()? != OP_CHECKMULTISIG {
            return None;
        }

        let required = small_int_value(b[0])?;
        let total = small_int_value(b[b.len() - 2])?;

        let mut keys = Vec::with_capacity(total);
        for instruction in Instructions::new(&b[1..b.len() - 2]) {
            let instruction = instruction.ok()?;
            match instruction.opcode {
                33 | 65 => keys.push(instruction.data.to_vec()),
                _ => return None,
            }
        }

        if keys.len() != total || required == 0 || required > total {
            return None;
        }
        Some((required, keys))
    }

    fn match_op_return(&self) -> Option<Vec<u8>> {
        let b = self.0.as_slice();
        if b.first() != Some(&OP_RETURN) {
            return None;
        }

        let mut instructions = Instructions::new(&b[1..]);
        let push = instructions.next()?.ok()?;
        if instructions.next().is_some() || push.opcode > OP_PUSHDATA4 {
            return None;
        }

        // only the minimal encoding round-trips
        let data = push.data.to_vec();
        (Script::op_return(&data) == *self).then_some(data)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// Push encoding
// =============================================================================

/// Encode a data push with the smallest push opcode for its length
pub fn push_data(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut out = Vec::with_capacity(len + 5);

    if len < OP_PUSHDATA1 as usize {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }

    out.extend_from_slice(data);
    out
}

/// Assemble a claiming script from stack items. Empty items become `OP_0`,
/// single bytes 1..=16 become `OP_1`..`OP_16`, everything else is pushed.
pub fn push_all(items: &[Vec<u8>]) -> Script {
    let mut bytes = Vec::new();
    for item in items {
        match item.as_slice() {
            [] => bytes.push(OP_0),
            [n @ 1..=16] => bytes.push(OP_1 + n - 1),
            data => bytes.extend_from_slice(&push_data(data)),
        }
    }
    Script(bytes)
}

/// Drop standalone `OP_CODESEPARATOR` opcodes; push payloads are left intact.
pub fn remove_code_separators(script: &Script) -> Script {
    let bytes = script.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());

    for instruction in Instructions::new(bytes) {
        match instruction {
            Ok(ins) if ins.opcode == OP_CODESEPARATOR => {}
            Ok(ins) => out.extend_from_slice(&bytes[ins.range]),
            Err(start) => {
                out.extend_from_slice(&bytes[start..]);
                break;
            }
        }
    }

    Script(out)
}

// =============================================================================
// Instruction iteration
// =============================================================================

struct Instruction<'a> {
    opcode: u8,
    data: &'a [u8],
    range: std::ops::Range<usize>,
}

/// Walks opcode boundaries. Yields `Err(offset)` once on a truncated push.
struct Instructions<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Instructions<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0, done: false }
    }

    fn read_len(&self, at: usize, width: usize) -> Option<usize> {
        let raw = self.bytes.get(at..at + width)?;
        let mut buf = [0u8; 4];
        buf[..width].copy_from_slice(raw);
        Some(u32::from_le_bytes(buf) as usize)
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.bytes.len() {
            return None;
        }

        let start = self.pos;
        let opcode = self.bytes[start];
        let (header, len) = match opcode {
            0x01..=0x4b => (1, Some(opcode as usize)),
            OP_PUSHDATA1 => (2, self.read_len(start + 1, 1)),
            OP_PUSHDATA2 => (3, self.read_len(start + 1, 2)),
            OP_PUSHDATA4 => (5, self.read_len(start + 1, 4)),
            _ => (1, Some(0)),
        };

        let end = len.and_then(|l| start.checked_add(header)?.checked_add(l));
        match end {
            Some(end) if end <= self.bytes.len() => {
                self.pos = end;
                Some(Ok(Instruction {
                    opcode,
                    data: &self.bytes[start + header..end],
                    range: start..end,
                }))
            }
            _ => {
                self.done = true;
                Some(Err(start))
            }
        }
    }
}

fn to_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}
