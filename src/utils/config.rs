//! Signer Configuration
//!
//! Engine-wide settings with presets, validation and an environment overlay.
//! Settings are plain values handed to the coin entry. The debug logging
//! switch is the one process-wide piece; `apply` sets it and is meant to run
//! once at startup.

use serde::{Deserialize, Serialize};

/// Hard ceiling on the number of UTXOs a single plan may spend.
pub const MAX_UTXOS_HARD_LIMIT: usize = 3000;

/// Environment variable overriding `max_utxos`
pub const ENV_MAX_UTXOS: &str = "UTXO_SIGNER_MAX_UTXOS";
/// Environment variable enabling debug logging (`1`/`true`)
pub const ENV_DEBUG: &str = "UTXO_SIGNER_DEBUG";

/// Signer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerSettings {
    /// Maximum UTXOs considered by the input selector
    pub max_utxos: usize,
    /// Check externally supplied signatures against their digests in `compile`
    pub verify_external_signatures: bool,
    /// Emit debug log lines
    pub debug_logging: bool,
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self::standard()
    }
}

impl SignerSettings {
    /// Standard preset
    pub fn standard() -> Self {
        Self {
            max_utxos: MAX_UTXOS_HARD_LIMIT,
            verify_external_signatures: false,
            debug_logging: false,
        }
    }

    /// Strict preset: smaller selection window, every external signature checked
    pub fn strict() -> Self {
        Self {
            max_utxos: 500,
            verify_external_signatures: true,
            debug_logging: false,
        }
    }

    /// Overlay values from the process environment
    pub fn from_env() -> Self {
        let mut settings = Self::standard();

        if let Ok(raw) = std::env::var(ENV_MAX_UTXOS) {
            match raw.trim().parse::<usize>() {
                Ok(value) => settings.max_utxos = value,
                Err(_) => crate::log_warn!("config", "Ignoring unparsable max_utxos", value = raw),
            }
        }

        if let Ok(raw) = std::env::var(ENV_DEBUG) {
            settings.debug_logging = matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }

        settings
    }

    /// Validate settings, returning human-readable problems
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.max_utxos == 0 {
            problems.push("max_utxos must be at least 1".to_string());
        }
        if self.max_utxos > MAX_UTXOS_HARD_LIMIT {
            problems.push(format!(
                "max_utxos {} exceeds hard limit {}",
                self.max_utxos, MAX_UTXOS_HARD_LIMIT
            ));
        }

        problems
    }

    /// Set the process-wide logging switch. Call once at startup.
    pub fn apply(&self) {
        if self.debug_logging {
            super::logging::enable_debug();
        } else {
            super::logging::disable_debug();
        }
    }
}
