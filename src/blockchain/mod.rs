// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateways to the external signing provider and the tracker contract.
//!
//! This module provides:
//! - The `ProviderGateway` and `ContractGateway` seams the session engine
//!   is written against
//! - Alloy-backed implementations of both
//! - A chain id watcher that turns network switches into notifications
//! - Ether/wei conversion used at the gateway boundary

pub mod client;
pub mod contract;
pub mod provider;
pub mod types;
pub mod units;
pub mod watcher;

pub use client::GatewayError;
pub use contract::{ContractGateway, TrackerContract};
pub use provider::{LocalWalletProvider, ProviderGateway};
pub use types::*;
pub use units::{format_ether, parse_ether, AmountError};
pub use watcher::ChainWatcher;
