//! Unified error types for the signer
//!
//! Every entry point returns a `SignerError` carrying a stable,
//! enumerable `ErrorCode` so callers can branch without parsing text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all planning, building and signing operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl SignerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientFunds, msg)
    }

    pub fn missing_redeem_script(script_hash: &str) -> Self {
        Self::new(ErrorCode::MissingRedeemScript, "Missing redeem script")
            .with_details(format!("script hash {}", script_hash))
    }

    pub fn missing_private_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingPrivateKey, msg)
    }

    pub fn invalid_output_script(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidOutputScript, msg)
    }

    pub fn signing_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SigningFailed, msg)
    }

    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::new(
            ErrorCode::IndexOutOfRange,
            format!("Input index {} out of range ({} inputs)", index, len),
        )
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SignerError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    InvalidInput,
    InvalidAddress,
    InvalidAmount,
    InvalidPrivateKey,
    InvalidPublicKey,
    InvalidSigHashType,
    UnsupportedChain,

    // Planning errors
    NoUtxos,
    DustInputsOnly,
    InsufficientFunds,
    UtxoLimitExceeded,

    // Script resolution errors
    MissingRedeemScript,
    MissingPrivateKey,
    InvalidOutputScript,

    // Signing errors
    SigningFailed,
    IndexOutOfRange,
    InvalidSignatureCount,
    SignatureVerificationFailed,

    // Parse errors
    JsonError,
    HexError,

    // Internal
    Internal,
}

/// Result type alias for signer operations
pub type SignerResult<T> = Result<T, SignerError>;

// Conversions from common error types

impl From<serde_json::Error> for SignerError {
    fn from(e: serde_json::Error) -> Self {
        SignerError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for SignerError {
    fn from(e: hex::FromHexError) -> Self {
        SignerError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<bitcoin::secp256k1::Error> for SignerError {
    fn from(e: bitcoin::secp256k1::Error) -> Self {
        use bitcoin::secp256k1::Error as Secp;
        let code = match e {
            Secp::InvalidSecretKey => ErrorCode::InvalidPrivateKey,
            Secp::InvalidPublicKey => ErrorCode::InvalidPublicKey,
            Secp::IncorrectSignature | Secp::InvalidSignature => {
                ErrorCode::SignatureVerificationFailed
            }
            _ => ErrorCode::SigningFailed,
        };
        SignerError::new(code, format!("Secp256k1 error: {}", e))
    }
}

impl From<crate::wallet::address::AddressError> for SignerError {
    fn from(e: crate::wallet::address::AddressError) -> Self {
        SignerError::new(ErrorCode::InvalidAddress, e.to_string())
    }
}
