// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// EVM network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
}

/// Local development node (Hardhat / Anvil).
pub const LOCAL_DEVNET: NetworkConfig = NetworkConfig {
    name: "Local Devnet",
    chain_id: 31337,
    rpc_url: "http://127.0.0.1:8545",
};

/// Ethereum Sepolia testnet.
pub const SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Sepolia Testnet",
    chain_id: 11155111,
    rpc_url: "https://rpc.sepolia.org",
};

/// Address the tracker contract gets on a fresh local devnet.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Look up a known network by chain id.
pub fn network_for_chain(chain_id: u64) -> Option<NetworkConfig> {
    [LOCAL_DEVNET, SEPOLIA]
        .into_iter()
        .find(|network| network.chain_id == chain_id)
}

/// Outcome of a mutating contract call once it has been mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
}

/// Identity record as stored by the contract's `users(address)` getter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainUser {
    pub username: String,
    pub user_id: String,
    pub registered: bool,
}

/// Change notifications emitted by the signing provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The set of exposed accounts changed; empty means the user disconnected.
    AccountsChanged(Vec<Address>),
    /// The provider switched to another chain.
    NetworkChanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_lookup_by_chain_id() {
        assert_eq!(network_for_chain(31337).map(|n| n.name), Some("Local Devnet"));
        assert_eq!(network_for_chain(11155111).map(|n| n.name), Some("Sepolia Testnet"));
        assert!(network_for_chain(1).is_none());
    }

    #[test]
    fn default_contract_address_parses() {
        assert!(DEFAULT_CONTRACT_ADDRESS.parse::<Address>().is_ok());
    }
}
