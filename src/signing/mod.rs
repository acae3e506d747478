//! Detached Signing
//!
//! Splits signing into two calls for keys held elsewhere (hardware wallets,
//! air-gapped signers):
//! 1. `preimage` produces the digest every required signature commits to
//! 2. `compiler` assembles the signed transaction from returned signatures

pub mod compiler;
pub mod preimage;

pub use compiler::*;
pub use preimage::*;

use serde::{Deserialize, Serialize};

/// Signing algorithm a digest is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningAlgorithm {
    /// secp256k1 ECDSA, DER encoded
    #[default]
    Secp256k1Ecdsa,
}
