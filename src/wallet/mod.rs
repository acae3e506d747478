//! Wallet Module
//!
//! Addresses, private keys and the spendable-output set.

pub mod address;
pub mod keys;
pub mod utxo;

pub use address::{AddressError, AddressKind, AddressPayload};
pub use keys::{KeyStore, PrivateKey};
pub use utxo::{select_utxos, SelectionParams, TransactionPlan, Utxo};
