// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity registration state.

use serde::Serialize;

use crate::blockchain::OnChainUser;
use crate::error::{Operation, SessionError, SessionResult};

/// Safety margin added on top of the node's gas estimate, in percent.
pub const GAS_BUFFER_PERCENT: u64 = 20;

/// Apply [`GAS_BUFFER_PERCENT`] to a gas estimate, rounding up.
pub fn buffered_gas_limit(estimate: u64) -> u64 {
    let scaled = (u128::from(estimate) * u128::from(100 + GAS_BUFFER_PERCENT) + 99) / 100;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// User identity as known to the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub username: String,
    pub user_id: String,
    pub registered: bool,
}

impl From<OnChainUser> for Identity {
    fn from(user: OnChainUser) -> Self {
        Self {
            username: user.username,
            user_id: user.user_id,
            registered: user.registered,
        }
    }
}

/// Validated registration fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub user_id: String,
}

impl Registration {
    /// Both fields must be non-blank. The values are kept exactly as given.
    pub fn new(username: &str, user_id: &str) -> SessionResult<Self> {
        if username.trim().is_empty() {
            return Err(SessionError::invalid_input(
                Operation::Register,
                "username must not be empty",
            ));
        }
        if user_id.trim().is_empty() {
            return Err(SessionError::invalid_input(
                Operation::Register,
                "user id must not be empty",
            ));
        }
        Ok(Self {
            username: username.to_string(),
            user_id: user_id.to_string(),
        })
    }
}

/// Owns the session's [`Identity`].
#[derive(Debug, Default)]
pub struct IdentityRegistrar {
    identity: Identity,
}

impl IdentityRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_registered(&self) -> bool {
        self.identity.registered
    }

    /// Reject a second registration before any external call is made.
    pub fn ensure_unregistered(&self) -> SessionResult<()> {
        if self.identity.registered {
            return Err(SessionError::AlreadyRegistered {
                op: Operation::Register,
            });
        }
        Ok(())
    }

    /// Adopt the identity read from the contract. A registered identity is
    /// never overwritten; it only goes away with [`clear`](Self::clear).
    pub fn load(&mut self, user: OnChainUser) {
        if self.identity.registered {
            return;
        }
        self.identity = user.into();
    }

    /// Record a confirmed registration.
    pub fn mark_registered(&mut self, registration: Registration) {
        if self.identity.registered {
            return;
        }
        self.identity = Identity {
            username: registration.username,
            user_id: registration.user_id,
            registered: true,
        };
    }

    pub fn clear(&mut self) {
        self.identity = Identity::default();
    }
}
