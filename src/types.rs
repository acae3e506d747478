//! Shared types for the signer
//!
//! Chain identifiers, per-chain parameters and the JSON response envelope.

use crate::fees::FeeCalculator;
use crate::tx::HashAlgorithm;
use serde::{Deserialize, Serialize};

// =============================================================================
// Chain Types
// =============================================================================

/// Supported UTXO networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    Bitcoin,
    BitcoinTestnet,
    Litecoin,
    Dogecoin,
    Verge,
    BitcoinCash,
}

impl Chain {
    pub const ALL: [Chain; 6] = [
        Chain::Bitcoin,
        Chain::BitcoinTestnet,
        Chain::Litecoin,
        Chain::Dogecoin,
        Chain::Verge,
        Chain::BitcoinCash,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet => "BTC",
            Chain::Litecoin => "LTC",
            Chain::Dogecoin => "DOGE",
            Chain::Verge => "XVG",
            Chain::BitcoinCash => "BCH",
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Chain::Verge => 6,
            _ => 8,
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Chain::BitcoinTestnet)
    }

    /// Address, hashing and fee parameters for this chain
    pub fn params(&self) -> ChainParams {
        let base = ChainParams {
            p2pkh_prefix: 0x00,
            p2sh_prefix: 0x05,
            hrp: None,
            hash_algorithm: HashAlgorithm::Sha256d,
            fork_id: None,
            tx_version: 1,
            dust_threshold: 546,
            fee_calculator: FeeCalculator::default(),
        };

        match self {
            Chain::Bitcoin => ChainParams { hrp: Some("bc"), ..base },
            Chain::BitcoinTestnet => ChainParams {
                p2pkh_prefix: 0x6f,
                p2sh_prefix: 0xc4,
                hrp: Some("tb"),
                ..base
            },
            Chain::Litecoin => ChainParams {
                p2pkh_prefix: 0x30,
                p2sh_prefix: 0x32,
                hrp: Some("ltc"),
                ..base
            },
            Chain::Dogecoin => ChainParams {
                p2pkh_prefix: 0x1e,
                p2sh_prefix: 0x16,
                dust_threshold: 1_000_000,
                ..base
            },
            Chain::Verge => ChainParams {
                p2pkh_prefix: 0x1e,
                p2sh_prefix: 0x21,
                ..base
            },
            Chain::BitcoinCash => ChainParams {
                fork_id: Some(0),
                ..base
            },
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Chain::Bitcoin => "bitcoin",
            Chain::BitcoinTestnet => "bitcoin-testnet",
            Chain::Litecoin => "litecoin",
            Chain::Dogecoin => "dogecoin",
            Chain::Verge => "verge",
            Chain::BitcoinCash => "bitcoin-cash",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "bitcoin_testnet" | "btc_testnet" | "testnet" => Ok(Chain::BitcoinTestnet),
            "litecoin" | "ltc" => Ok(Chain::Litecoin),
            "dogecoin" | "doge" => Ok(Chain::Dogecoin),
            "verge" | "xvg" => Ok(Chain::Verge),
            "bitcoin_cash" | "bitcoincash" | "bch" => Ok(Chain::BitcoinCash),
            _ => Err(format!("Unknown chain: {}", s)),
        }
    }
}

/// Per-chain constants consumed by the address codec, builder and digest engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainParams {
    /// Base58 version byte for pay-to-public-key-hash addresses
    pub p2pkh_prefix: u8,
    /// Base58 version byte for pay-to-script-hash addresses
    pub p2sh_prefix: u8,
    /// Bech32 human-readable part, when the chain has segwit addresses
    pub hrp: Option<&'static str>,
    pub hash_algorithm: HashAlgorithm,
    /// Replay-protection fork id; forces the witness digest for every input
    pub fork_id: Option<u32>,
    pub tx_version: i32,
    /// Smallest change output worth creating
    pub dust_threshold: u64,
    pub fee_calculator: FeeCalculator,
}

impl ChainParams {
    pub fn supports_segwit(&self) -> bool {
        self.hrp.is_some()
    }
}

// =============================================================================
// API Response
// =============================================================================

/// JSON envelope returned by the `entry::json` functions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<crate::error::SignerError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: crate::error::SignerError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn from_result(result: crate::error::SignerResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"code":"internal","message":"Serialization failed"}}"#.to_string()
        })
    }
}
