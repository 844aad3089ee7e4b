// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared alloy provider construction and gateway error mapping.

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};

/// Build a read-only HTTP provider.
pub fn connect_read_only(rpc_url: &str) -> Result<DynProvider, GatewayError> {
    let url = parse_rpc_url(rpc_url)?;
    Ok(ProviderBuilder::new().connect_http(url).erased())
}

/// Build an HTTP provider that signs with every key in `wallet`.
pub fn connect_with_wallet(
    rpc_url: &str,
    wallet: EthereumWallet,
) -> Result<DynProvider, GatewayError> {
    let url = parse_rpc_url(rpc_url)?;
    Ok(ProviderBuilder::new().wallet(wallet).connect_http(url).erased())
}

fn parse_rpc_url(rpc_url: &str) -> Result<url::Url, GatewayError> {
    rpc_url
        .parse()
        .map_err(|e: url::ParseError| GatewayError::InvalidRpcUrl(e.to_string()))
}

/// Create a signer from a hex private key (with or without `0x`).
pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, GatewayError> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim())
        .map_err(|e| GatewayError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| GatewayError::InvalidPrivateKey(e.to_string()))
}

/// Errors surfaced by the provider and contract adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Request rejected by user")]
    UserRejected,

    #[error("Insufficient funds for gas")]
    InsufficientFunds,

    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("Timed out waiting for confirmation")]
    Timeout,

    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}

impl GatewayError {
    /// Classify a raw transport/contract error message.
    ///
    /// Nodes report these conditions only as text, so matching is done on
    /// lowercase substrings.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("insufficient funds") {
            GatewayError::InsufficientFunds
        } else if lower.contains("user rejected") || lower.contains("user denied") {
            GatewayError::UserRejected
        } else {
            GatewayError::Rpc(message)
        }
    }

    /// Classify an error raised while estimating gas.
    pub fn classify_estimation(message: impl Into<String>) -> Self {
        match Self::classify(message) {
            GatewayError::Rpc(message) => GatewayError::GasEstimation(message),
            other => other,
        }
    }
}
