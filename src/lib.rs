// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet Balance Tracker - session and reconciliation engine
//!
//! Keeps a client-side wallet session consistent with a balance tracker
//! contract: who is connected, whether they are registered, what the
//! contract says their balance is, and which transfers this session has
//! confirmed.
//!
//! ## Modules
//!
//! - `blockchain` - provider and contract gateways (alloy), units, watcher
//! - `session` - the session engine and its state components
//! - `error` - operation-tagged error taxonomy
//! - `console` - line commands over a long-lived session
//! - `config` - environment configuration
//! - `logging` - tracing subscriber setup

pub mod blockchain;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod session;

pub use config::SessionConfig;
pub use error::{Operation, SessionError, SessionResult};
pub use session::{SessionSnapshot, SessionStatus, WalletSession};
