//! Hashing and Base58Check helpers
//!
//! Thin wrappers over `bitcoin::hashes` so the rest of the crate works
//! with plain byte arrays.

use bitcoin::hashes::{hash160, sha256, sha256d, Hash};

pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(data).to_byte_array()
}

pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

/// Base58 encode `payload` with a 4-byte double-SHA256 checksum
pub fn base58check_encode(payload: &[u8]) -> String {
    let checksum = sha256d(payload);
    let mut data = Vec::with_capacity(payload.len() + 4);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum[..4]);

    bs58::encode(data).into_string()
}

/// Decode a Base58Check string, returning the payload without checksum.
/// `None` for bad characters, short input or checksum mismatch.
pub fn base58check_decode(encoded: &str) -> Option<Vec<u8>> {
    let decoded = bs58::decode(encoded).into_vec().ok()?;
    if decoded.len() < 5 {
        return None;
    }

    let (payload, checksum) = decoded.split_at(decoded.len() - 4);
    if sha256d(payload)[..4] != *checksum {
        return None;
    }

    Some(payload.to_vec())
}
