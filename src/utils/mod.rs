//! Utilities Module
//!
//! Hashing, logging and configuration shared across the crate.

pub mod config;
pub mod crypto;
pub mod logging;

pub use config::SignerSettings;
