// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mutating flows: registration, deposit, withdraw, and balance pulls.
//!
//! At most one of these runs at a time; [`InFlight`] is the authoritative
//! guard. Each flow captures the session epoch before its first external
//! call and commits nothing if the session changed in the meantime.

use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::{Address, U256};

use super::balance::Balance;
use super::identity::{buffered_gas_limit, Identity, Registration};
use super::ledger::{LedgerEntry, TransactionKind};
use super::WalletSession;
use crate::blockchain::{parse_ether, TxReceipt};
use crate::error::{Operation, SessionError, SessionResult};

/// Single-slot mutual exclusion for mutating operations.
#[derive(Debug, Default)]
pub struct InFlight(AtomicBool);

impl InFlight {
    pub fn try_acquire(&self, op: Operation) -> SessionResult<InFlightGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard { flag: &self.0 })
            .map_err(|_| SessionError::OperationInProgress { op })
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the in-flight slot on drop, on every exit path.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Result of a confirmed mutating operation.
///
/// The operation itself succeeded on-chain. `balance_error` is set when the
/// follow-up balance read failed; `balance` then holds the last known value.
#[derive(Debug, Clone)]
pub struct Confirmed<T> {
    pub value: T,
    pub receipt: TxReceipt,
    pub balance: Balance,
    pub balance_error: Option<SessionError>,
}

impl WalletSession {
    /// Register `username`/`user_id` for the connected account.
    pub async fn register(&self, username: &str, user_id: &str) -> SessionResult<Confirmed<Identity>> {
        let op = Operation::Register;
        let registration = Registration::new(username, user_id)?;

        let (account, epoch) = self.connected_account(op).await?;
        self.state.read().await.registrar.ensure_unregistered()?;

        let _guard = self.in_flight.try_acquire(op)?;
        // Re-check under the guard: a registration may have finished between
        // the read above and acquiring the slot.
        self.state.read().await.registrar.ensure_unregistered()?;

        let estimate = self
            .contract
            .estimate_register_gas(account, &registration.username, &registration.user_id)
            .await
            .map_err(|e| SessionError::from_gateway(op, e))?;
        let gas_limit = buffered_gas_limit(estimate);
        tracing::debug!(estimate, gas_limit, "Registration gas estimated");

        let receipt = self
            .contract
            .register(account, &registration.username, &registration.user_id, gas_limit)
            .await
            .map_err(|e| SessionError::from_gateway(op, e))?;
        ensure_success(op, &receipt)?;

        let identity = {
            let mut state = self.state.write().await;
            if !state.manager.is_current(epoch) {
                tracing::warn!(%op, tx_hash = %receipt.tx_hash, "Discarding result of stale registration");
                return Err(SessionError::SessionChanged { op });
            }
            state.registrar.mark_registered(registration);
            state.registrar.identity().clone()
        };
        tracing::info!(
            account = %account,
            username = %identity.username,
            tx_hash = %receipt.tx_hash,
            "Registration confirmed"
        );

        let (balance, balance_error) = self.settle_balance(op, account, epoch).await?;
        Ok(Confirmed {
            value: identity,
            receipt,
            balance,
            balance_error,
        })
    }

    /// Deposit `amount` ether into the contract.
    pub async fn deposit(&self, amount: &str) -> SessionResult<Confirmed<LedgerEntry>> {
        self.transfer(TransactionKind::Deposit, amount).await
    }

    /// Withdraw `amount` ether from the contract.
    pub async fn withdraw(&self, amount: &str) -> SessionResult<Confirmed<LedgerEntry>> {
        self.transfer(TransactionKind::Withdraw, amount).await
    }

    async fn transfer(
        &self,
        kind: TransactionKind,
        amount: &str,
    ) -> SessionResult<Confirmed<LedgerEntry>> {
        let op = kind.operation();
        let amount_wei =
            parse_ether(amount).map_err(|e| SessionError::invalid_input(op, e.to_string()))?;

        let (account, epoch) = self.connected_account(op).await?;
        let _guard = self.in_flight.try_acquire(op)?;

        let receipt = match kind {
            TransactionKind::Deposit => self.contract.deposit(account, amount_wei).await,
            TransactionKind::Withdraw => self.contract.withdraw(account, amount_wei).await,
        }
        .map_err(|e| SessionError::from_gateway(op, e))?;
        ensure_success(op, &receipt)?;

        // Balance first, then the ledger entry.
        let (balance, balance_error) = self.settle_balance(op, account, epoch).await?;

        let entry = {
            let mut state = self.state.write().await;
            if !state.manager.is_current(epoch) {
                tracing::warn!(%op, tx_hash = %receipt.tx_hash, "Discarding result of stale transfer");
                return Err(SessionError::SessionChanged { op });
            }
            state.ledger.record_completed(kind, amount_wei)
        };
        tracing::info!(
            account = %account,
            %op,
            amount = %entry.amount(),
            tx_hash = %receipt.tx_hash,
            "Transfer confirmed"
        );

        Ok(Confirmed {
            value: entry,
            receipt,
            balance,
            balance_error,
        })
    }

    /// Manually pull the balance. Shares the in-flight slot with mutating
    /// operations, so it never overlaps one of them or another pull.
    pub async fn refresh_balance(&self) -> SessionResult<Balance> {
        let op = Operation::RefreshBalance;
        let (account, epoch) = self.connected_account(op).await?;
        let _guard = self.in_flight.try_acquire(op)?;
        self.refresh_for(op, account, epoch).await
    }

    /// Read the balance and install it if the session is still `epoch`.
    pub(super) async fn refresh_for(
        &self,
        op: Operation,
        account: Address,
        epoch: u64,
    ) -> SessionResult<Balance> {
        let wei: U256 = self
            .contract
            .get_balance(account)
            .await
            .map_err(|e| SessionError::from_read(op, e))?;

        let mut state = self.state.write().await;
        if !state.manager.is_current(epoch) {
            return Err(SessionError::SessionChanged { op });
        }
        let balance = state.balance.apply(wei);
        tracing::debug!(account = %account, balance = %balance, "Balance refreshed");
        Ok(balance)
    }

    /// Post-confirmation refresh. A failed read keeps the last known balance
    /// and is handed back to the caller; only a session change aborts.
    async fn settle_balance(
        &self,
        op: Operation,
        account: Address,
        epoch: u64,
    ) -> SessionResult<(Balance, Option<SessionError>)> {
        match self.refresh_for(op, account, epoch).await {
            Ok(balance) => Ok((balance, None)),
            Err(err @ SessionError::SessionChanged { .. }) => {
                tracing::warn!(%op, "Discarding result: session changed before balance refresh");
                Err(err)
            }
            Err(err) => {
                tracing::warn!(%op, error = %err, "Balance refresh failed, keeping last known value");
                let last_known = self.state.read().await.balance.balance();
                Ok((last_known, Some(err)))
            }
        }
    }
}

fn ensure_success(op: Operation, receipt: &TxReceipt) -> SessionResult<()> {
    if receipt.success {
        return Ok(());
    }
    tracing::warn!(%op, tx_hash = %receipt.tx_hash, gas_used = receipt.gas_used, "Transaction not successful");
    Err(SessionError::TransactionFailed {
        op,
        tx_hash: receipt.tx_hash.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_exclusive_and_released_on_drop() {
        let slot = InFlight::default();
        let guard = slot.try_acquire(Operation::Deposit).unwrap();
        assert!(slot.is_held());

        let err = slot.try_acquire(Operation::Withdraw).unwrap_err();
        assert_eq!(
            err,
            SessionError::OperationInProgress {
                op: Operation::Withdraw
            }
        );

        drop(guard);
        assert!(!slot.is_held());
        assert!(slot.try_acquire(Operation::Register).is_ok());
    }

    #[test]
    fn unsuccessful_receipt_is_transaction_failed() {
        let receipt = TxReceipt {
            tx_hash: "0xdead".into(),
            block_number: 7,
            gas_used: 50_000,
            success: false,
        };
        assert_eq!(
            ensure_success(Operation::Register, &receipt),
            Err(SessionError::TransactionFailed {
                op: Operation::Register,
                tx_hash: "0xdead".into()
            })
        );
    }
}
