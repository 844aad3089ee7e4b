// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Connection state of the session.
//!
//! The manager owns the connected account and an epoch counter. Every hard
//! transition (account switch, reset) bumps the epoch; asynchronous work
//! captures the epoch when it starts and may only commit while it is still
//! current.

use alloy::primitives::Address;
use serde::Serialize;

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected { registered: bool },
}

/// The connected account, if any. `connected` is derived from it so the two
/// can never disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    account: Option<Address>,
}

impl Session {
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

#[derive(Debug, Default)]
pub struct SessionManager {
    session: Session,
    connecting: bool,
    epoch: u64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn account(&self) -> Option<Address> {
        self.session.account
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    /// Mark a connect attempt as started; returns the epoch it runs under.
    pub fn begin_connect(&mut self) -> u64 {
        self.connecting = true;
        self.epoch
    }

    /// Clear the connecting flag if the attempt is still the current one.
    pub fn end_connect(&mut self, epoch: u64) {
        if self.is_current(epoch) {
            self.connecting = false;
        }
    }

    /// Install `account` as the session account. Returns the new epoch.
    pub fn switch_account(&mut self, account: Address) -> u64 {
        self.epoch += 1;
        self.session.account = Some(account);
        self.connecting = false;
        self.epoch
    }

    /// Drop back to `Disconnected`. Returns the new epoch.
    pub fn reset(&mut self) -> u64 {
        self.epoch += 1;
        self.session = Session::default();
        self.connecting = false;
        self.epoch
    }

    pub fn status(&self, registered: bool) -> SessionStatus {
        if self.session.is_connected() {
            SessionStatus::Connected { registered }
        } else if self.connecting {
            SessionStatus::Connecting
        } else {
            SessionStatus::Disconnected
        }
    }
}

/// Shorten an address for display, e.g. `0xf39F…2266`.
pub fn mask_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}
