// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Per-network settings and contract descriptors are read from JSON files;
//! process-level options come from the environment.
//!
//! ## Storage Layout
//!
//! ```text
//! networks_configs/
//!   {network}.json          # NetworkSettings
//! abis/
//!   {network}/{name}.json   # { "address": "0x...", "abi": [...] }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `NETWORK_CONFIGS_DIR` | Directory of per-network settings | `networks_configs` |
//! | `ABIS_DIR` | Directory of per-network contract descriptors | `abis` |
//! | `NETWORK` | Network used by the CLI | `arbitrum_one` |
//! | `PRIVATE_KEY` | Hex or PEM key used by the CLI | Required by the CLI |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{address, Address, TxHash};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::amount::Amount;
use crate::blockchain::NativeCurrency;
use crate::token::TokenDescriptor;

pub const NETWORK_CONFIGS_DIR_ENV: &str = "NETWORK_CONFIGS_DIR";
pub const ABIS_DIR_ENV: &str = "ABIS_DIR";
pub const NETWORK_ENV: &str = "NETWORK";
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_NETWORK_CONFIGS_DIR: &str = "networks_configs";
pub const DEFAULT_ABIS_DIR: &str = "abis";
pub const DEFAULT_NETWORK: &str = "arbitrum_one";
const DEFAULT_LOG_FILTER: &str = "info";

/// Receipt wait used when a network file does not set one.
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 1_000;

/// Placeholder address routers use for the native coin.
pub const NATIVE_TOKEN_SENTINEL: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("ABI of {address} lacks: {missing}")]
    IncompleteAbi { address: String, missing: String },

    #[error("environment variable not set: {0}")]
    EnvVarNotSet(&'static str),
}

/// Settings for one EVM network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Network name for display
    pub name: String,
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Block explorer URL
    #[serde(default)]
    pub explorer_url: Option<String>,
    /// Native coin symbol, also used for price lookups
    pub native_symbol: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    /// Address routers expect for the native coin
    #[serde(default = "default_native_token_address")]
    pub native_token_address: Address,
    /// Skip submissions while the gas price is above this (gwei)
    #[serde(default)]
    pub max_gas_price_gwei: Option<Decimal>,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

fn default_native_decimals() -> u8 {
    18
}

fn default_native_token_address() -> Address {
    NATIVE_TOKEN_SENTINEL
}

fn default_receipt_timeout_secs() -> u64 {
    DEFAULT_RECEIPT_TIMEOUT_SECS
}

fn default_receipt_poll_interval_ms() -> u64 {
    DEFAULT_RECEIPT_POLL_INTERVAL_MS
}

impl NetworkSettings {
    /// Arbitrum One mainnet.
    pub fn arbitrum_one() -> Self {
        Self {
            name: "Arbitrum One".to_string(),
            chain_id: 42161,
            rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
            explorer_url: Some("https://arbiscan.io".to_string()),
            native_symbol: "ETH".to_string(),
            native_decimals: 18,
            native_token_address: NATIVE_TOKEN_SENTINEL,
            max_gas_price_gwei: None,
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SECS,
            receipt_poll_interval_ms: DEFAULT_RECEIPT_POLL_INTERVAL_MS,
        }
    }

    /// Avalanche Fuji testnet.
    pub fn avalanche_fuji() -> Self {
        Self {
            name: "Avalanche Fuji Testnet".to_string(),
            chain_id: 43113,
            rpc_url: "https://api.avax-test.network/ext/bc/C/rpc".to_string(),
            explorer_url: Some("https://testnet.snowtrace.io".to_string()),
            native_symbol: "AVAX".to_string(),
            native_decimals: 18,
            native_token_address: NATIVE_TOKEN_SENTINEL,
            max_gas_price_gwei: None,
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SECS,
            receipt_poll_interval_ms: DEFAULT_RECEIPT_POLL_INTERVAL_MS,
        }
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }

    pub fn native_currency(&self) -> NativeCurrency {
        NativeCurrency::new(self.native_symbol.clone(), self.native_decimals)
    }

    /// Gas price ceiling converted to wei.
    pub fn gas_price_ceiling_wei(&self) -> Result<Option<u128>, ConfigError> {
        let Some(gwei) = self.max_gas_price_gwei else {
            return Ok(None);
        };
        let wei = Amount::from_display(gwei, 9)
            .map_err(|e| ConfigError::Invalid(format!("max_gas_price_gwei: {e}")))?;
        u128::try_from(wei.raw())
            .map(Some)
            .map_err(|_| ConfigError::Invalid("max_gas_price_gwei too large".to_string()))
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    /// Explorer link for a transaction, if an explorer is configured.
    pub fn explorer_tx_url(&self, hash: &TxHash) -> Option<String> {
        self.explorer_url
            .as_deref()
            .map(|base| format!("{}/tx/{:?}", base.trim_end_matches('/'), hash))
    }
}

/// Address and ABI of a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub address: Address,
    pub abi: JsonAbi,
}

/// File-backed, network-scoped configuration.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    networks_dir: PathBuf,
    abis_dir: PathBuf,
}

impl ConfigStore {
    pub fn new(networks_dir: impl Into<PathBuf>, abis_dir: impl Into<PathBuf>) -> Self {
        Self {
            networks_dir: networks_dir.into(),
            abis_dir: abis_dir.into(),
        }
    }

    /// Directories from `NETWORK_CONFIGS_DIR` / `ABIS_DIR`, with defaults.
    pub fn from_env() -> Self {
        let networks = std::env::var(NETWORK_CONFIGS_DIR_ENV)
            .unwrap_or_else(|_| DEFAULT_NETWORK_CONFIGS_DIR.to_string());
        let abis = std::env::var(ABIS_DIR_ENV).unwrap_or_else(|_| DEFAULT_ABIS_DIR.to_string());
        Self::new(networks, abis)
    }

    /// Load `<networks_dir>/<network>.json`.
    pub fn network(&self, network: &str) -> Result<NetworkSettings, ConfigError> {
        check_segment(network)?;
        read_json(&self.networks_dir.join(format!("{network}.json")))
    }

    /// Load `<abis_dir>/<network>/<name>.json`.
    pub fn contract(&self, network: &str, name: &str) -> Result<ContractDescriptor, ConfigError> {
        check_segment(network)?;
        check_segment(name)?;
        read_json(&self.abis_dir.join(network).join(format!("{name}.json")))
    }

    /// Load a contract descriptor and check it is usable as an ERC-20 token.
    pub fn token(&self, network: &str, name: &str) -> Result<TokenDescriptor, ConfigError> {
        let ContractDescriptor { address, abi } = self.contract(network, name)?;
        TokenDescriptor::new(address, abi)
    }
}

fn check_segment(segment: &str) -> Result<(), ConfigError> {
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("invalid name: {segment:?}")))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG` and `LOG_FORMAT`; does nothing if a subscriber is
/// already installed.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
