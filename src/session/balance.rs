// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cached contract balance.

use std::fmt;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::blockchain::format_ether;

/// Last confirmed contract balance, in wei. Displays as decimal ether.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance(U256);

impl Balance {
    pub fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    pub fn wei(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_ether(self.0))
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Owns the cached [`Balance`]. Values only ever come from a contract read;
/// nothing here derives a balance from the ledger.
#[derive(Debug, Default)]
pub struct BalanceSync {
    balance: Balance,
    refreshed_at: Option<DateTime<Utc>>,
}

impl BalanceSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Replace the cached value with a fresh contract read.
    pub fn apply(&mut self, wei: U256) -> Balance {
        self.balance = Balance::from_wei(wei);
        self.refreshed_at = Some(Utc::now());
        self.balance
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_zero() {
        let sync = BalanceSync::new();
        assert_eq!(sync.balance().to_string(), "0");
        assert!(sync.refreshed_at().is_none());
    }

    #[test]
    fn apply_replaces_and_clear_resets() {
        let mut sync = BalanceSync::new();
        let balance = sync.apply(U256::from(2_500_000_000_000_000_000u64));
        assert_eq!(balance.to_string(), "2.5");
        assert!(sync.refreshed_at().is_some());

        sync.clear();
        assert_eq!(sync.balance(), Balance::default());
    }

    #[test]
    fn serializes_as_decimal_string() {
        let balance = Balance::from_wei(U256::from(1_000_000_000_000_000u64));
        assert_eq!(serde_json::to_string(&balance).unwrap(), "\"0.001\"");
    }
}
