// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory gateways for driving `WalletSession` without a chain.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tokio::sync::{broadcast, Notify};

use wallet_balance_tracker::blockchain::{
    parse_ether, ContractGateway, GatewayError, OnChainUser, ProviderEvent, ProviderGateway,
    TxReceipt,
};
use wallet_balance_tracker::WalletSession;

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

pub fn wei(ether: &str) -> U256 {
    parse_ether(ether).unwrap()
}

/// Pauses a mocked call until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
struct ContractState {
    users: HashMap<Address, OnChainUser>,
    balances: HashMap<Address, U256>,
    block: u64,
}

/// Contract double that behaves like the deployed tracker.
#[derive(Default)]
pub struct MockContract {
    state: Mutex<ContractState>,
    calls: AtomicUsize,
    pub gas_estimate: Mutex<Option<Result<u64, GatewayError>>>,
    pub last_gas_limit: Mutex<Option<u64>>,
    pub revert_next: AtomicBool,
    pub fail_next_submit: Mutex<Option<GatewayError>>,
    pub fail_balance_reads: AtomicBool,
    pub fail_identity_reads: AtomicBool,
    pub submit_gate: Mutex<Option<Arc<Gate>>>,
    balance_reads: AtomicUsize,
}

impl MockContract {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }

    pub fn seed_user(&self, account: Address, username: &str, user_id: &str, balance: U256) {
        let mut state = self.state.lock().unwrap();
        state.users.insert(
            account,
            OnChainUser {
                username: username.into(),
                user_id: user_id.into(),
                registered: true,
            },
        );
        state.balances.insert(account, balance);
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    /// Pause the next register, deposit or withdraw inside the gateway.
    pub fn gate_submits(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.submit_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn receipt(&self, state: &mut ContractState, success: bool) -> TxReceipt {
        state.block += 1;
        TxReceipt {
            tx_hash: format!("0x{:064x}", state.block),
            block_number: state.block,
            gas_used: 50_000,
            success,
        }
    }

    async fn wait_gate(&self) {
        let gate = self.submit_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    fn submit(
        &self,
        apply: impl FnOnce(&mut ContractState) -> bool,
    ) -> Result<TxReceipt, GatewayError> {
        if let Some(err) = self.fail_next_submit.lock().unwrap().take() {
            return Err(err);
        }
        let mut state = self.state.lock().unwrap();
        let success = !self.revert_next.swap(false, Ordering::SeqCst) && apply(&mut state);
        Ok(self.receipt(&mut state, success))
    }
}

#[async_trait]
impl ContractGateway for MockContract {
    async fn estimate_register_gas(
        &self,
        _account: Address,
        _username: &str,
        _user_id: &str,
    ) -> Result<u64, GatewayError> {
        self.hit();
        self.gas_estimate
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Ok(100_000))
    }

    async fn register(
        &self,
        account: Address,
        username: &str,
        user_id: &str,
        gas_limit: u64,
    ) -> Result<TxReceipt, GatewayError> {
        self.hit();
        *self.last_gas_limit.lock().unwrap() = Some(gas_limit);
        self.wait_gate().await;
        self.submit(|state| {
            let user = state.users.entry(account).or_default();
            if user.registered {
                return false;
            }
            *user = OnChainUser {
                username: username.into(),
                user_id: user_id.into(),
                registered: true,
            };
            true
        })
    }

    async fn deposit(&self, account: Address, amount_wei: U256) -> Result<TxReceipt, GatewayError> {
        self.hit();
        self.wait_gate().await;
        self.submit(|state| {
            *state.balances.entry(account).or_default() += amount_wei;
            true
        })
    }

    async fn withdraw(
        &self,
        account: Address,
        amount_wei: U256,
    ) -> Result<TxReceipt, GatewayError> {
        self.hit();
        self.wait_gate().await;
        self.submit(|state| {
            let balance = state.balances.entry(account).or_default();
            if *balance < amount_wei {
                return false;
            }
            *balance -= amount_wei;
            true
        })
    }

    async fn get_balance(&self, account: Address) -> Result<U256, GatewayError> {
        self.hit();
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_balance_reads.load(Ordering::SeqCst) {
            return Err(GatewayError::Rpc("connection reset".into()));
        }
        Ok(self.balance_of(account))
    }

    async fn get_identity(&self, account: Address) -> Result<OnChainUser, GatewayError> {
        self.hit();
        if self.fail_identity_reads.load(Ordering::SeqCst) {
            return Err(GatewayError::Rpc("connection reset".into()));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .get(&account)
            .cloned()
            .unwrap_or_default())
    }
}

/// Provider double with scripted accounts and a live event channel.
pub struct MockProvider {
    accounts: Mutex<Vec<Address>>,
    authorized: AtomicBool,
    pub reject: AtomicBool,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockProvider {
    pub fn new(accounts: Vec<Address>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            authorized: AtomicBool::new(false),
            reject: AtomicBool::new(false),
            events,
        })
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    /// Mark accounts as exposed without a prompt, as after a page reload.
    pub fn authorize(&self) {
        self.authorized.store(true, Ordering::SeqCst);
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl ProviderGateway for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, GatewayError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(GatewayError::UserRejected);
        }
        self.authorized.store(true, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn current_accounts(&self) -> Result<Vec<Address>, GatewayError> {
        if !self.authorized.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

pub fn session(
    provider: &Arc<MockProvider>,
    contract: &Arc<MockContract>,
) -> Arc<WalletSession> {
    Arc::new(WalletSession::new(
        Some(provider.clone() as Arc<dyn ProviderGateway>),
        contract.clone() as Arc<dyn ContractGateway>,
    ))
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
