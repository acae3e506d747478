//! UTXO Signer Library
//!
//! Plans, builds and signs transactions for Bitcoin-family UTXO chains.
//!
//! # Architecture
//!
//! This crate provides:
//! - **script**: Script classification, standard script builders, push encoding
//! - **tx**: Transaction model, signature digests, builder and signer
//! - **wallet**: Addresses, private keys, input selection
//! - **fees**: Linear size-based fee model
//! - **signing**: Detached pre-image / compile protocol for external signers
//! - **entry**: Per-chain dispatch and the JSON façade
//!
//! # JSON Usage
//!
//! The `entry::json` functions take a JSON `SigningInput` and return an
//! `ApiResponse` envelope: `{"success": bool, "data": ..., "error": ...}`.
//!
//! # Security
//!
//! Private keys are held in `zeroize` buffers, cleared on drop and never
//! written to logs.
//!
//! # Example
//!
//! ```rust,ignore
//! use utxo_signer::{CoinEntry, Chain, SigningInput};
//!
//! let mut input = SigningInput::new(Chain::Bitcoin, "bc1q...", 50_000);
//! input.byte_fee = 10;
//! // utxos, private_keys, change_address ...
//! let output = CoinEntry::for_chain(Chain::Bitcoin).sign(&input)?;
//! println!("{}", output.encoded);
//! ```

pub mod entry;
pub mod error;
pub mod fees;
pub mod script;
pub mod serde_bytes;
pub mod signing;
pub mod tx;
pub mod types;
pub mod utils;
pub mod wallet;

pub use entry::CoinEntry;
pub use error::{ErrorCode, SignerError, SignerResult};
pub use script::{Script, ScriptPattern};
pub use tx::{SigHashType, SigningInput, SigningOutput, Transaction};
pub use types::{ApiResponse, Chain, ChainParams};
pub use utils::SignerSettings;
