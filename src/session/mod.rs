// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Engine
//!
//! [`WalletSession`] sequences every call to the provider and the contract
//! and keeps the local state consistent with them.
//!
//! ## Components
//!
//! - `manager` - connected account, lifecycle status, reset epoch
//! - `identity` - registration state and gas buffering
//! - `balance` - last confirmed contract balance
//! - `ledger` - append-only record of confirmed transfers, views, export
//! - `operations` - register / deposit / withdraw / refresh flows
//!
//! ## Lifecycle
//!
//! ```text
//! Disconnected -> Connecting -> Connected{unregistered} -> Connected{registered}
//!      ^                              |                          |
//!      +------ empty accounts / network change / disconnect -----+
//! ```
//!
//! Change notifications take precedence over in-flight work: they reset the
//! state immediately, and whatever the interrupted call returns later is
//! discarded.

pub mod balance;
pub mod identity;
pub mod ledger;
pub mod manager;
pub mod operations;

use std::sync::Arc;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast::error::RecvError, RwLock};
use tokio_util::sync::CancellationToken;

use crate::blockchain::{ContractGateway, ProviderEvent, ProviderGateway};
use crate::error::{Operation, SessionError, SessionResult};

pub use balance::{Balance, BalanceSync};
pub use identity::{Identity, IdentityRegistrar};
pub use ledger::{
    parse_export, ExportParseError, LedgerEntry, LedgerFilter, LedgerTotals, TransactionKind,
    TransactionLedger,
};
pub use manager::{mask_address, Session, SessionManager, SessionStatus};
pub use operations::{Confirmed, InFlight};

/// Everything the engine owns, guarded by one lock.
#[derive(Debug, Default)]
struct SessionState {
    manager: SessionManager,
    registrar: IdentityRegistrar,
    balance: BalanceSync,
    ledger: TransactionLedger,
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        self.manager.status(self.registrar.is_registered())
    }

    /// Hard reset of every component. Returns the new epoch.
    fn reset(&mut self) -> u64 {
        self.registrar.clear();
        self.balance.clear();
        self.ledger.clear();
        self.manager.reset()
    }

    /// Start over with `account`. Returns the new epoch.
    fn adopt_account(&mut self, account: Address) -> u64 {
        self.registrar.clear();
        self.balance.clear();
        self.ledger.clear();
        self.manager.switch_account(account)
    }
}

/// Point-in-time view for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub account: Option<String>,
    pub masked_account: Option<String>,
    pub identity: Identity,
    pub balance: Balance,
    pub balance_refreshed_at: Option<DateTime<Utc>>,
    pub income: String,
    pub expense: String,
    pub transactions: Vec<LedgerEntry>,
}

/// Client-side session controller.
pub struct WalletSession {
    provider: Option<Arc<dyn ProviderGateway>>,
    contract: Arc<dyn ContractGateway>,
    state: RwLock<SessionState>,
    in_flight: InFlight,
}

impl WalletSession {
    /// Create a session. `provider` is `None` when no signing provider is
    /// installed; every operation then fails with `ProviderUnavailable`.
    pub fn new(
        provider: Option<Arc<dyn ProviderGateway>>,
        contract: Arc<dyn ContractGateway>,
    ) -> Self {
        Self {
            provider,
            contract,
            state: RwLock::new(SessionState::default()),
            in_flight: InFlight::default(),
        }
    }

    fn provider(&self, op: Operation) -> SessionResult<&Arc<dyn ProviderGateway>> {
        self.provider
            .as_ref()
            .ok_or(SessionError::ProviderUnavailable { op })
    }

    /// Connected account and the epoch it belongs to.
    async fn connected_account(&self, op: Operation) -> SessionResult<(Address, u64)> {
        self.provider(op)?;
        let state = self.state.read().await;
        let account = state
            .manager
            .account()
            .ok_or(SessionError::NotConnected { op })?;
        Ok((account, state.manager.epoch()))
    }

    /// Ask the provider for accounts and connect to the first one, then
    /// derive the registration state from the contract.
    pub async fn connect(&self) -> SessionResult<SessionStatus> {
        let op = Operation::Connect;
        let provider = self.provider(op)?;
        let _guard = self.in_flight.try_acquire(op)?;

        let epoch = self.state.write().await.manager.begin_connect();
        tracing::info!("Requesting accounts from provider");

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                self.state.write().await.manager.end_connect(epoch);
                tracing::warn!(error = %e, "Wallet connection failed");
                return Err(SessionError::from_gateway(op, e));
            }
        };

        let Some(account) = accounts.first().copied() else {
            self.state.write().await.manager.end_connect(epoch);
            return Err(SessionError::UserRejected { op });
        };

        let epoch = {
            let mut state = self.state.write().await;
            if !state.manager.is_current(epoch) {
                return Err(SessionError::SessionChanged { op });
            }
            if state.manager.account() == Some(account) {
                state.manager.end_connect(epoch);
                epoch
            } else {
                state.adopt_account(account)
            }
        };
        tracing::info!(account = %account, "Wallet connected");

        self.load_identity(account, epoch).await?;
        Ok(self.status().await)
    }

    /// Reconnect without prompting, using accounts the provider already
    /// exposes. Returns the status afterwards; staying disconnected is not
    /// an error.
    pub async fn restore(&self) -> SessionResult<SessionStatus> {
        let op = Operation::Connect;
        let provider = self.provider(op)?;
        let accounts = provider
            .current_accounts()
            .await
            .map_err(|e| SessionError::from_read(op, e))?;

        match accounts.first().copied() {
            Some(account) => self.switch_to(account).await,
            None => Ok(self.status().await),
        }
    }

    /// Tear the session down, as if the provider exposed no accounts.
    pub async fn disconnect(&self) {
        let epoch = self.state.write().await.reset();
        tracing::info!(epoch, "Session disconnected");
    }

    /// React to an accounts-changed notification.
    pub async fn handle_accounts_changed(&self, accounts: &[Address]) -> SessionResult<SessionStatus> {
        match accounts.first().copied() {
            None => {
                let epoch = self.state.write().await.reset();
                tracing::info!(epoch, "Accounts cleared, session reset");
                Ok(SessionStatus::Disconnected)
            }
            Some(account) => self.switch_to(account).await,
        }
    }

    /// React to a network-changed notification: drop everything and load
    /// again from scratch.
    pub async fn handle_network_changed(&self) -> SessionResult<SessionStatus> {
        let epoch = self.state.write().await.reset();
        tracing::warn!(epoch, "Network changed, restarting session");
        if self.provider.is_none() {
            return Ok(SessionStatus::Disconnected);
        }
        self.restore().await
    }

    pub async fn handle_event(&self, event: ProviderEvent) -> SessionResult<SessionStatus> {
        match event {
            ProviderEvent::AccountsChanged(accounts) => self.handle_accounts_changed(&accounts).await,
            ProviderEvent::NetworkChanged => self.handle_network_changed().await,
        }
    }

    /// Consume provider notifications until `shutdown` fires. Subscribes
    /// once; the subscription ends with the loop.
    pub async fn run_events(self: Arc<Self>, shutdown: CancellationToken) {
        let Some(provider) = self.provider.clone() else {
            tracing::warn!("No signing provider, not listening for changes");
            return;
        };
        let mut events = provider.subscribe();
        tracing::info!("Listening for provider changes");

        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Provider listener shutting down");
                    return;
                }
                event = events.recv() => event,
            };

            let result = match event {
                Ok(event) => self.handle_event(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    // Missed notifications: nothing we hold can be trusted.
                    tracing::warn!(skipped, "Provider notifications lagged");
                    self.handle_network_changed().await
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Provider notification channel closed");
                    return;
                }
            };

            if let Err(e) = result {
                tracing::warn!(error = %e, code = e.error_code(), "Failed to apply provider change");
            }
        }
    }

    /// Move to `account`, resetting unless it is already the session account.
    async fn switch_to(&self, account: Address) -> SessionResult<SessionStatus> {
        let (epoch, changed) = {
            let mut state = self.state.write().await;
            if state.manager.account() == Some(account) {
                (state.manager.epoch(), false)
            } else {
                (state.adopt_account(account), true)
            }
        };
        if changed {
            tracing::info!(account = %account, "Switched account");
        }
        let needs_lookup = changed || !self.state.read().await.registrar.is_registered();
        if needs_lookup {
            self.load_identity(account, epoch).await?;
        }
        Ok(self.status().await)
    }

    /// Read the identity for `account`; if registered, also pull the balance.
    async fn load_identity(&self, account: Address, epoch: u64) -> SessionResult<()> {
        let op = Operation::IdentityLookup;
        let user = self
            .contract
            .get_identity(account)
            .await
            .map_err(|e| SessionError::from_read(op, e))?;

        let registered = {
            let mut state = self.state.write().await;
            if !state.manager.is_current(epoch) {
                return Err(SessionError::SessionChanged { op });
            }
            state.registrar.load(user);
            state.registrar.is_registered()
        };
        tracing::info!(account = %account, registered, "Identity loaded");

        if registered {
            self.refresh_for(op, account, epoch).await?;
        }
        Ok(())
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status()
    }

    pub async fn session(&self) -> Session {
        self.state.read().await.manager.session()
    }

    pub async fn identity(&self) -> Identity {
        self.state.read().await.registrar.identity().clone()
    }

    pub async fn balance(&self) -> Balance {
        self.state.read().await.balance.balance()
    }

    /// Whether a mutating operation currently holds the in-flight slot.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_held()
    }

    pub async fn transactions(&self) -> Vec<LedgerEntry> {
        self.state.read().await.ledger.entries().to_vec()
    }

    pub async fn filter_transactions(&self, filter: LedgerFilter) -> Vec<LedgerEntry> {
        self.state.read().await.ledger.view(filter, "")
    }

    pub async fn search_transactions(&self, term: &str) -> Vec<LedgerEntry> {
        self.state.read().await.ledger.search(term)
    }

    pub async fn view_transactions(&self, filter: LedgerFilter, term: &str) -> Vec<LedgerEntry> {
        self.state.read().await.ledger.view(filter, term)
    }

    pub async fn totals(&self) -> LedgerTotals {
        self.state.read().await.ledger.totals()
    }

    pub async fn export_transactions(&self) -> String {
        self.state.read().await.ledger.export()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        let account = state.manager.account();
        let totals = state.ledger.totals();
        SessionSnapshot {
            status: state.status(),
            account: account.map(|a| a.to_string()),
            masked_account: account.as_ref().map(mask_address),
            identity: state.registrar.identity().clone(),
            balance: state.balance.balance(),
            balance_refreshed_at: state.balance.refreshed_at(),
            income: totals.deposited_ether(),
            expense: totals.withdrawn_ether(),
            transactions: state.ledger.entries().to_vec(),
        }
    }
}
