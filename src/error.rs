// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors returned by the session engine.

use std::fmt;

use serde::Serialize;

use crate::blockchain::GatewayError;

/// The engine operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Connect,
    IdentityLookup,
    Register,
    Deposit,
    Withdraw,
    RefreshBalance,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::IdentityLookup => "identity-lookup",
            Operation::Register => "register",
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
            Operation::RefreshBalance => "refresh-balance",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session engine error.
///
/// Local state is only mutated after a step is confirmed, so any of these
/// leaves session, identity, balance and ledger as they were before the
/// failing step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No signing provider is installed. Fatal for the whole session.
    #[error("{op} failed: no signing provider available")]
    ProviderUnavailable { op: Operation },

    #[error("{op} failed: request rejected by user")]
    UserRejected { op: Operation },

    #[error("{op} failed: insufficient funds for gas")]
    InsufficientFunds { op: Operation },

    /// The call would revert, or the contract rejected the inputs.
    #[error("{op} failed: gas estimation failed: {message}")]
    GasEstimationFailed { op: Operation, message: String },

    /// Mined with a non-success receipt status; gas was still consumed.
    #[error("{op} failed: transaction {tx_hash} was not successful")]
    TransactionFailed { op: Operation, tx_hash: String },

    #[error("{op} failed: read failed: {message}")]
    ReadFailed { op: Operation, message: String },

    #[error("{op} failed: invalid input: {message}")]
    InvalidInput { op: Operation, message: String },

    #[error("{op} failed: no connected session")]
    NotConnected { op: Operation },

    #[error("{op} failed: identity already registered")]
    AlreadyRegistered { op: Operation },

    #[error("{op} failed: another operation is in flight")]
    OperationInProgress { op: Operation },

    /// The session was reset while the call was outstanding; its result was
    /// discarded.
    #[error("{op} result discarded: session changed while it was in flight")]
    SessionChanged { op: Operation },

    #[error("{op} failed: {message}")]
    Other { op: Operation, message: String },
}

impl SessionError {
    /// Operation the error originated from.
    pub fn operation(&self) -> Operation {
        match self {
            SessionError::ProviderUnavailable { op }
            | SessionError::UserRejected { op }
            | SessionError::InsufficientFunds { op }
            | SessionError::GasEstimationFailed { op, .. }
            | SessionError::TransactionFailed { op, .. }
            | SessionError::ReadFailed { op, .. }
            | SessionError::InvalidInput { op, .. }
            | SessionError::NotConnected { op }
            | SessionError::AlreadyRegistered { op }
            | SessionError::OperationInProgress { op }
            | SessionError::SessionChanged { op }
            | SessionError::Other { op, .. } => *op,
        }
    }

    /// Stable machine-readable code for the presentation layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::ProviderUnavailable { .. } => "provider_unavailable",
            SessionError::UserRejected { .. } => "user_rejected",
            SessionError::InsufficientFunds { .. } => "insufficient_funds",
            SessionError::GasEstimationFailed { .. } => "gas_estimation_failed",
            SessionError::TransactionFailed { .. } => "transaction_failed",
            SessionError::ReadFailed { .. } => "read_failed",
            SessionError::InvalidInput { .. } => "invalid_input",
            SessionError::NotConnected { .. } => "not_connected",
            SessionError::AlreadyRegistered { .. } => "already_registered",
            SessionError::OperationInProgress { .. } => "operation_in_progress",
            SessionError::SessionChanged { .. } => "session_changed",
            SessionError::Other { .. } => "other",
        }
    }

    pub fn invalid_input(op: Operation, message: impl Into<String>) -> Self {
        SessionError::InvalidInput {
            op,
            message: message.into(),
        }
    }

    /// Map a failed mutating call.
    pub fn from_gateway(op: Operation, err: GatewayError) -> Self {
        match err {
            GatewayError::UserRejected => SessionError::UserRejected { op },
            GatewayError::InsufficientFunds => SessionError::InsufficientFunds { op },
            GatewayError::GasEstimation(message) => {
                SessionError::GasEstimationFailed { op, message }
            }
            other => SessionError::Other {
                op,
                message: other.to_string(),
            },
        }
    }

    /// Map a failed read.
    pub fn from_read(op: Operation, err: GatewayError) -> Self {
        SessionError::ReadFailed {
            op,
            message: err.to_string(),
        }
    }
}

/// Result type for engine operations.
pub type SessionResult<T> = Result<T, SessionError>;
