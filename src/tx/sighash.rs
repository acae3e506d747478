//! Digest Engine
//!
//! Computes the digest a signature commits to for one input, under a
//! sighash-type flag combination, with either the legacy algorithm or the
//! BIP143 witness algorithm.

use super::{encode_script, Transaction, TransactionOutput};
use crate::error::{ErrorCode, SignerError, SignerResult};
use crate::script::Script;
use crate::utils::crypto::{sha256, sha256d};
use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// How a chain turns a serialized preimage into a digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// Double SHA256
    #[default]
    Sha256d,
    /// Single SHA256
    Sha256,
}

impl HashAlgorithm {
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        match self {
            HashAlgorithm::Sha256d => sha256d(data),
            HashAlgorithm::Sha256 => sha256(data),
        }
    }
}

/// Which digest algorithm an input is signed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureVersion {
    Base,
    WitnessV0,
}

/// Base sighash mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigHashBase {
    All,
    None,
    Single,
}

/// Validated sighash flags: a base mode plus optional ANYONECANPAY and FORKID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SigHashType(u32);

impl SigHashType {
    pub const ALL: Self = Self(0x01);
    pub const NONE: Self = Self(0x02);
    pub const SINGLE: Self = Self(0x03);
    pub const ALL_ANYONE_CAN_PAY: Self = Self(0x81);
    pub const NONE_ANYONE_CAN_PAY: Self = Self(0x82);
    pub const SINGLE_ANYONE_CAN_PAY: Self = Self(0x83);

    pub const ANYONE_CAN_PAY_FLAG: u32 = 0x80;
    pub const FORK_ID_FLAG: u32 = 0x40;

    pub fn from_u32(raw: u32) -> SignerResult<Self> {
        let base = raw & 0x1f;
        let flags = raw & !0x1f;
        let known_flags = Self::ANYONE_CAN_PAY_FLAG | Self::FORK_ID_FLAG;

        if !(1..=3).contains(&base) || flags & !known_flags != 0 {
            return Err(SignerError::new(
                ErrorCode::InvalidSigHashType,
                format!("Unsupported sighash type {:#x}", raw),
            ));
        }
        Ok(Self(raw))
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Byte appended to each signature
    pub fn byte(&self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub fn base(&self) -> SigHashBase {
        match self.0 & 0x1f {
            0x02 => SigHashBase::None,
            0x03 => SigHashBase::Single,
            _ => SigHashBase::All,
        }
    }

    pub fn is_anyone_can_pay(&self) -> bool {
        self.0 & Self::ANYONE_CAN_PAY_FLAG != 0
    }

    pub fn has_fork_id(&self) -> bool {
        self.0 & Self::FORK_ID_FLAG != 0
    }

    pub fn is_single(&self) -> bool {
        self.base() == SigHashBase::Single
    }

    pub fn is_none(&self) -> bool {
        self.base() == SigHashBase::None
    }

    pub fn with_fork_id(self) -> Self {
        Self(self.0 | Self::FORK_ID_FLAG)
    }
}

impl Default for SigHashType {
    fn default() -> Self {
        Self::ALL
    }
}

impl TryFrom<u32> for SigHashType {
    type Error = SignerError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_u32(raw)
    }
}

impl From<SigHashType> for u32 {
    fn from(t: SigHashType) -> u32 {
        t.0
    }
}

/// Legacy digest for SINGLE without a matching output: the value 1
const SINGLE_WITHOUT_OUTPUT: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 1;
    one
};

// =============================================================================
// Digests
// =============================================================================

impl Transaction {
    /// Digest for input `index`. `script_code` must already have any
    /// `OP_CODESEPARATOR` removed where the legacy rules require it.
    pub fn signature_hash(
        &self,
        script_code: &Script,
        index: usize,
        hash_type: SigHashType,
        amount: u64,
        version: SignatureVersion,
    ) -> SignerResult<[u8; 32]> {
        if index >= self.inputs.len() {
            return Err(SignerError::index_out_of_range(index, self.inputs.len()));
        }

        match version {
            SignatureVersion::Base => Ok(self.legacy_signature_hash(script_code, index, hash_type)),
            SignatureVersion::WitnessV0 => {
                let preimage = self.witness_preimage(script_code, index, hash_type, amount)?;
                Ok(self.hash_algorithm.hash(&preimage))
            }
        }
    }

    fn legacy_signature_hash(&self, script_code: &Script, index: usize, hash_type: SigHashType) -> [u8; 32] {
        if hash_type.is_single() && index >= self.outputs.len() {
            return SINGLE_WITHOUT_OUTPUT;
        }

        let mut data = Vec::new();
        data.extend_from_slice(&self.version.to_le_bytes());

        // Inputs
        let signed_only = hash_type.is_anyone_can_pay();
        let input_indices: Vec<usize> = if signed_only {
            vec![index]
        } else {
            (0..self.inputs.len()).collect()
        };

        super::write_var_int(input_indices.len() as u64, &mut data);
        for i in input_indices {
            let input = &self.inputs[i];
            input.previous_output.encode(&mut data);

            if i == index {
                encode_script(script_code, &mut data);
            } else {
                data.push(0x00);
            }

            let sequence = if i != index && (hash_type.is_none() || hash_type.is_single()) {
                0
            } else {
                input.sequence
            };
            data.extend_from_slice(&sequence.to_le_bytes());
        }

        // Outputs
        match hash_type.base() {
            SigHashBase::None => data.push(0x00),
            SigHashBase::Single => {
                super::write_var_int(index as u64 + 1, &mut data);
                for (i, output) in self.outputs.iter().take(index + 1).enumerate() {
                    if i == index {
                        output.encode(&mut data);
                    } else {
                        TransactionOutput::null().encode(&mut data);
                    }
                }
            }
            SigHashBase::All => {
                super::write_var_int(self.outputs.len() as u64, &mut data);
                for output in &self.outputs {
                    output.encode(&mut data);
                }
            }
        }

        data.extend_from_slice(&self.lock_time.to_le_bytes());
        data.extend_from_slice(&hash_type.raw().to_le_bytes());

        self.hash_algorithm.hash(&data)
    }

    /// BIP143 preimage for input `index`
    pub fn witness_preimage(
        &self,
        script_code: &Script,
        index: usize,
        hash_type: SigHashType,
        amount: u64,
    ) -> SignerResult<Vec<u8>> {
        let input = self
            .inputs
            .get(index)
            .ok_or_else(|| SignerError::index_out_of_range(index, self.inputs.len()))?;

        let mut data = Vec::with_capacity(156 + script_code.len());

        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(&self.hash_prevouts(hash_type));
        data.extend_from_slice(&self.hash_sequence(hash_type));

        input.previous_output.encode(&mut data);
        encode_script(script_code, &mut data);
        data.extend_from_slice(&amount.to_le_bytes());
        data.extend_from_slice(&input.sequence.to_le_bytes());

        data.extend_from_slice(&self.hash_outputs(hash_type, index));
        data.extend_from_slice(&self.lock_time.to_le_bytes());

        let type_field = match self.fork_id {
            Some(fork_id) => hash_type.raw() | (fork_id << 8),
            None => hash_type.raw(),
        };
        data.extend_from_slice(&type_field.to_le_bytes());

        Ok(data)
    }

    fn hash_prevouts(&self, hash_type: SigHashType) -> [u8; 32] {
        if hash_type.is_anyone_can_pay() {
            return [0u8; 32];
        }
        let mut data = Vec::with_capacity(self.inputs.len() * 36);
        for input in &self.inputs {
            input.previous_output.encode(&mut data);
        }
        self.hash_algorithm.hash(&data)
    }

    fn hash_sequence(&self, hash_type: SigHashType) -> [u8; 32] {
        if hash_type.is_anyone_can_pay() || hash_type.base() != SigHashBase::All {
            return [0u8; 32];
        }
        let mut data = Vec::with_capacity(self.inputs.len() * 4);
        for input in &self.inputs {
            data.extend_from_slice(&input.sequence.to_le_bytes());
        }
        self.hash_algorithm.hash(&data)
    }

    fn hash_outputs(&self, hash_type: SigHashType, index: usize) -> [u8; 32] {
        match hash_type.base() {
            SigHashBase::All => {
                let mut data = Vec::new();
                for output in &self.outputs {
                    output.encode(&mut data);
                }
                self.hash_algorithm.hash(&data)
            }
            SigHashBase::Single if index < self.outputs.len() => {
                let mut data = Vec::new();
                self.outputs[index].encode(&mut data);
                self.hash_algorithm.hash(&data)
            }
            _ => [0u8; 32],
        }
    }
}
