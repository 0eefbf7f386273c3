//! # Client configuration
//!
//! Static settings the client needs before it can talk to a ledger, loaded
//! from TOML:
//!
//! ```toml
//! contract_id = "CDLZ...ABCD"
//! rpc_url = "https://soroban-testnet.stellar.org"
//! network_passphrase = "Test SDF Network ; September 2015"
//! min_code_length = 12
//!
//! [tokens.ETN]
//! address = "CAS3...WXYZ"
//! decimals = 7
//! ```
//!
//! `VOUCHER_RPC_URL`, when set, overrides `rpc_url`. Fee rates, expiry
//! defaults and the token whitelist are *not* configured here; they are read
//! from the ledger on every operation.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::code::DEFAULT_MIN_CODE_LENGTH;
use crate::types::Account;

pub const RPC_URL_ENV: &str = "VOUCHER_RPC_URL";

const DEFAULT_DECIMALS: u32 = 7;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub address: Account,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub contract_id: String,
    pub rpc_url: String,
    pub network_passphrase: String,
    #[serde(default = "default_min_code_length")]
    pub min_code_length: usize,
    /// Token symbols offered by the agent dashboard.
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenEntry>,
}

fn default_decimals() -> u32 {
    DEFAULT_DECIMALS
}

fn default_min_code_length() -> usize {
    DEFAULT_MIN_CODE_LENGTH
}

impl ClientConfig {
    /// Parse and validate a TOML document. Does not consult the environment.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, then apply the environment override.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_overrides(std::env::var(RPC_URL_ENV).ok());
        Ok(config)
    }

    /// Replace `rpc_url` with `rpc_url_override` when it is non-empty.
    pub fn apply_overrides(&mut self, rpc_url_override: Option<String>) {
        if let Some(url) = rpc_url_override {
            if !url.trim().is_empty() {
                self.rpc_url = url.trim().to_string();
            }
        }
    }

    /// Look a token up by its dashboard symbol, case-insensitively.
    pub fn token(&self, symbol: &str) -> Option<&TokenEntry> {
        let wanted = symbol.trim();
        self.tokens
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, entry)| entry)
    }

    pub fn token_symbols(&self) -> Vec<&str> {
        self.tokens.keys().map(String::as_str).collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.contract_id.trim().is_empty() {
            return Err(ConfigError::Invalid("contract_id is empty".into()));
        }
        if !Account::new(self.contract_id.trim()).is_contract() {
            return Err(ConfigError::Invalid(format!(
                "contract_id `{}` is not a contract address",
                self.contract_id
            )));
        }
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc_url is empty".into()));
        }
        if self.min_code_length == 0 {
            return Err(ConfigError::Invalid("min_code_length must be positive".into()));
        }
        for (symbol, entry) in &self.tokens {
            if entry.address.as_str().is_empty() {
                return Err(ConfigError::Invalid(format!("token {symbol} has no address")));
            }
            if !entry.address.is_contract() {
                return Err(ConfigError::Invalid(format!(
                    "token {symbol} address `{}` is not a contract address",
                    entry.address
                )));
            }
            // 10^28 is the largest scale amounts can be parsed at.
            if entry.decimals > 28 {
                return Err(ConfigError::Invalid(format!(
                    "token {symbol} has too many decimals"
                )));
            }
        }
        Ok(())
    }
}
