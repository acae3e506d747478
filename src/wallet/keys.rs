//! Private Keys and the Signing Capability
//!
//! Key bytes live in `Zeroizing` buffers and are wiped when the call that
//! supplied them drops its `SigningInput`.

use crate::error::{SignerError, SignerResult};
use crate::signing::SigningAlgorithm;
use crate::utils::crypto::hash160;
use bitcoin::secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Deserializer};
use std::fmt;
use zeroize::Zeroizing;

/// A secp256k1 private key
#[derive(Clone)]
pub struct PrivateKey {
    bytes: Zeroizing<[u8; 32]>,
}

impl PrivateKey {
    pub fn from_slice(bytes: &[u8]) -> SignerResult<Self> {
        SecretKey::from_slice(bytes)?;
        let mut buf = Zeroizing::new([0u8; 32]);
        buf.copy_from_slice(bytes);
        Ok(Self { bytes: buf })
    }

    pub fn from_hex(s: &str) -> SignerResult<Self> {
        let bytes = Zeroizing::new(hex::decode(s.trim_start_matches("0x"))?);
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    fn secret_key(&self) -> SignerResult<SecretKey> {
        Ok(SecretKey::from_slice(&self.bytes[..])?)
    }

    /// SEC1 public key, 33 bytes compressed or 65 uncompressed
    pub fn public_key(&self, compressed: bool) -> SignerResult<Vec<u8>> {
        let secp = Secp256k1::signing_only();
        let public = PublicKey::from_secret_key(&secp, &self.secret_key()?);
        Ok(if compressed {
            public.serialize().to_vec()
        } else {
            public.serialize_uncompressed().to_vec()
        })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Zeroizing::new(String::deserialize(deserializer)?);
        PrivateKey::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Signing capability
// =============================================================================

/// Sign a 32-byte digest. Returns DER bytes, or an empty vector when the
/// key or algorithm is unusable.
pub fn sign(digest: &[u8; 32], key_bytes: &[u8], algorithm: SigningAlgorithm) -> Vec<u8> {
    match algorithm {
        SigningAlgorithm::Secp256k1Ecdsa => {
            let Ok(secret) = SecretKey::from_slice(key_bytes) else {
                return Vec::new();
            };
            let secp = Secp256k1::signing_only();
            let message = Message::from_digest(*digest);
            secp.sign_ecdsa(&message, &secret).serialize_der().to_vec()
        }
    }
}

/// `sign` for a located key, failing on an empty capability result
pub fn sign_with_key(key: &PrivateKey, digest: &[u8; 32]) -> SignerResult<Vec<u8>> {
    let signature = sign(digest, key.as_bytes(), SigningAlgorithm::Secp256k1Ecdsa);
    if signature.is_empty() {
        return Err(SignerError::signing_failed("Signing capability returned no signature"));
    }
    Ok(signature)
}

/// Check a DER signature (without sighash byte) over a digest
pub fn verify(digest: &[u8; 32], der_signature: &[u8], public_key: &[u8]) -> SignerResult<()> {
    let secp = Secp256k1::verification_only();
    let mut signature = Signature::from_der(der_signature)?;
    signature.normalize_s();
    let public = PublicKey::from_slice(public_key)?;
    secp.verify_ecdsa(&Message::from_digest(*digest), &signature, &public)?;
    Ok(())
}

// =============================================================================
// Key lookup
// =============================================================================

struct StoredKey {
    key: PrivateKey,
    compressed: Vec<u8>,
    uncompressed: Vec<u8>,
}

/// Private keys indexed by the public-key hashes scripts commit to
pub struct KeyStore {
    keys: Vec<StoredKey>,
}

impl KeyStore {
    pub fn new(keys: &[PrivateKey]) -> SignerResult<Self> {
        let keys = keys
            .iter()
            .map(|key| {
                Ok(StoredKey {
                    compressed: key.public_key(true)?,
                    uncompressed: key.public_key(false)?,
                    key: key.clone(),
                })
            })
            .collect::<SignerResult<Vec<_>>>()?;
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key whose compressed or uncompressed public key hashes to `hash`,
    /// together with that public key
    pub fn find_by_public_key_hash(&self, hash: &[u8; 20]) -> Option<(&PrivateKey, &[u8])> {
        self.keys.iter().find_map(|stored| {
            if hash160(&stored.compressed) == *hash {
                Some((&stored.key, stored.compressed.as_slice()))
            } else if hash160(&stored.uncompressed) == *hash {
                Some((&stored.key, stored.uncompressed.as_slice()))
            } else {
                None
            }
        })
    }

    pub fn find_by_public_key(&self, public_key: &[u8]) -> Option<&PrivateKey> {
        self.find_by_public_key_hash(&hash160(public_key))
            .map(|(key, _)| key)
    }
}
