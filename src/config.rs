// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names and defaults for the tracker binary.
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RPC_URL` | JSON-RPC endpoint of the chain | `http://127.0.0.1:8545` |
//! | `CONTRACT_ADDRESS` | Deployed balance tracker contract | local devnet deployment |
//! | `WALLET_PRIVATE_KEY` | Comma-separated hex keys of the local wallet; the first starts active | none (no signing provider) |
//! | `CONFIRMATION_TIMEOUT_SECS` | Max wait for a receipt, `0` disables | `120` |
//! | `CHAIN_POLL_INTERVAL_SECS` | Network change polling interval | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::time::Duration;

use thiserror::Error;

use crate::blockchain::{DEFAULT_CONTRACT_ADDRESS, LOCAL_DEVNET};

/// Environment variable name for the JSON-RPC endpoint.
pub const RPC_URL_ENV: &str = "RPC_URL";

/// Environment variable name for the contract address.
pub const CONTRACT_ADDRESS_ENV: &str = "CONTRACT_ADDRESS";

/// Environment variable name for the wallet keys.
///
/// Holds one or more comma-separated hex keys. When unset the session runs
/// without a signing provider and every operation reports the provider as
/// unavailable.
pub const WALLET_PRIVATE_KEY_ENV: &str = "WALLET_PRIVATE_KEY";

/// Environment variable name for the confirmation timeout, in seconds.
pub const CONFIRMATION_TIMEOUT_ENV: &str = "CONFIRMATION_TIMEOUT_SECS";

/// Environment variable name for the chain id polling interval, in seconds.
pub const CHAIN_POLL_INTERVAL_ENV: &str = "CHAIN_POLL_INTERVAL_SECS";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CHAIN_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { name: &'static str, value: String },

    #[error("{CHAIN_POLL_INTERVAL_ENV} must be greater than zero")]
    ZeroPollInterval,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub rpc_url: String,
    pub contract_address: String,
    /// Empty when no signing provider is configured.
    pub private_keys: Vec<String>,
    /// `None` waits for the receipt indefinitely.
    pub confirmation_timeout: Option<Duration>,
    pub chain_poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rpc_url: LOCAL_DEVNET.rpc_url.to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            private_keys: Vec::new(),
            confirmation_timeout: Some(Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS)),
            chain_poll_interval: Duration::from_secs(DEFAULT_CHAIN_POLL_INTERVAL_SECS),
        }
    }
}

impl SessionConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variables. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let confirmation_timeout = match get(CONFIRMATION_TIMEOUT_ENV) {
            None => defaults.confirmation_timeout,
            Some(raw) => match parse_seconds(CONFIRMATION_TIMEOUT_ENV, raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        };

        let chain_poll_interval = match get(CHAIN_POLL_INTERVAL_ENV) {
            None => defaults.chain_poll_interval,
            Some(raw) => match parse_seconds(CHAIN_POLL_INTERVAL_ENV, raw)? {
                0 => return Err(ConfigError::ZeroPollInterval),
                secs => Duration::from_secs(secs),
            },
        };

        Ok(Self {
            rpc_url: get(RPC_URL_ENV).unwrap_or(defaults.rpc_url),
            contract_address: get(CONTRACT_ADDRESS_ENV).unwrap_or(defaults.contract_address),
            private_keys: get(WALLET_PRIVATE_KEY_ENV)
                .map(|keys| split_keys(&keys))
                .unwrap_or_default(),
            confirmation_timeout,
            chain_poll_interval,
        })
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_seconds(name: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidSeconds { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<SessionConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SessionConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.rpc_url, "http://127.0.0.1:8545");
        assert!(config.private_keys.is_empty());
        assert_eq!(config.confirmation_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            (RPC_URL_ENV, "https://rpc.sepolia.org"),
            (WALLET_PRIVATE_KEY_ENV, " 0xabc , 0xdef,"),
            (CONFIRMATION_TIMEOUT_ENV, "30"),
            (CHAIN_POLL_INTERVAL_ENV, "2"),
        ])
        .unwrap();
        assert_eq!(config.rpc_url, "https://rpc.sepolia.org");
        assert_eq!(config.private_keys, vec!["0xabc", "0xdef"]);
        assert_eq!(config.confirmation_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.chain_poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn blank_key_means_no_provider() {
        let config = load(&[(WALLET_PRIVATE_KEY_ENV, "   ")]).unwrap();
        assert!(config.private_keys.is_empty());
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = load(&[(CONFIRMATION_TIMEOUT_ENV, "0")]).unwrap();
        assert_eq!(config.confirmation_timeout, None);
    }

    #[test]
    fn rejects_bad_durations() {
        assert_eq!(
            load(&[(CONFIRMATION_TIMEOUT_ENV, "soon")]),
            Err(ConfigError::InvalidSeconds {
                name: CONFIRMATION_TIMEOUT_ENV,
                value: "soon".into()
            })
        );
        assert_eq!(
            load(&[(CHAIN_POLL_INTERVAL_ENV, "0")]),
            Err(ConfigError::ZeroPollInterval)
        );
    }
}
