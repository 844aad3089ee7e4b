// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing provider adapter.
//!
//! The session engine never looks a provider up by itself: a
//! [`ProviderGateway`] is injected at construction (or absent, which the
//! engine reports as `ProviderUnavailable`).

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use alloy::{network::EthereumWallet, primitives::Address, signers::local::PrivateKeySigner};
use async_trait::async_trait;
use tokio::sync::broadcast;

use super::client::GatewayError;
use super::types::ProviderEvent;

/// Capacity of the change-notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Account discovery and change notifications of a signing provider.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Ask the user to expose accounts (may prompt).
    async fn request_accounts(&self) -> Result<Vec<Address>, GatewayError>;

    /// Accounts already exposed to us, without prompting.
    async fn current_accounts(&self) -> Result<Vec<Address>, GatewayError>;

    /// Subscribe to account and network change notifications.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

#[derive(Debug)]
struct WalletState {
    active: Address,
    authorized: bool,
}

/// Provider backed by a fixed set of local keys.
///
/// One key is active at a time. The host switches between the keys or
/// locks the wallet; every change is broadcast as
/// [`ProviderEvent::AccountsChanged`]. [`wallet`](Self::wallet) hands out an
/// `EthereumWallet` holding every key, so a contract adapter built from it
/// can sign for whichever account is active.
pub struct LocalWalletProvider {
    signers: Vec<PrivateKeySigner>,
    state: RwLock<WalletState>,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalWalletProvider {
    /// Create a provider over `signers`; the first one starts active.
    /// Accounts are only exposed once `request_accounts` has been called.
    pub fn new(signers: Vec<PrivateKeySigner>) -> Result<Self, GatewayError> {
        let active = signers
            .first()
            .map(|signer| signer.address())
            .ok_or_else(|| GatewayError::InvalidPrivateKey("no signing key configured".into()))?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            signers,
            state: RwLock::new(WalletState {
                active,
                authorized: false,
            }),
            events,
        })
    }

    /// Every address this provider can sign for.
    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|signer| signer.address()).collect()
    }

    /// Wallet holding every key, with the first one as default signer.
    pub fn wallet(&self) -> EthereumWallet {
        let mut signers = self.signers.iter().cloned();
        let mut wallet = EthereumWallet::default();
        if let Some(first) = signers.next() {
            wallet.register_default_signer(first);
        }
        for signer in signers {
            wallet.register_signer(signer);
        }
        wallet
    }

    /// Sender half of the notification channel, for watchers.
    pub fn event_sender(&self) -> broadcast::Sender<ProviderEvent> {
        self.events.clone()
    }

    /// Make `address` the active account and notify subscribers. The wallet
    /// also counts as unlocked afterwards.
    pub fn switch_account(&self, address: Address) -> Result<(), GatewayError> {
        if !self.signers.iter().any(|signer| signer.address() == address) {
            return Err(GatewayError::InvalidAddress(format!(
                "{address} is not held by this wallet"
            )));
        }
        {
            let mut state = self.write_state();
            state.active = address;
            state.authorized = true;
        }
        tracing::info!(account = %address, "Provider switched account");
        let _ = self.events.send(ProviderEvent::AccountsChanged(vec![address]));
        Ok(())
    }

    /// Revoke access (the user locked or disconnected the wallet).
    pub fn revoke(&self) {
        self.write_state().authorized = false;
        tracing::info!("Provider access revoked");
        let _ = self.events.send(ProviderEvent::AccountsChanged(Vec::new()));
    }

    fn read_state(&self) -> RwLockReadGuard<'_, WalletState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, WalletState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProviderGateway for LocalWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, GatewayError> {
        let mut state = self.write_state();
        state.authorized = true;
        Ok(vec![state.active])
    }

    async fn current_accounts(&self) -> Result<Vec<Address>, GatewayError> {
        let state = self.read_state();
        if !state.authorized {
            return Ok(Vec::new());
        }
        Ok(vec![state.active])
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::network::{Ethereum, NetworkWallet};

    fn signer(seed: u8) -> PrivateKeySigner {
        PrivateKeySigner::from_slice(&[seed; 32]).unwrap()
    }

    #[test]
    fn needs_at_least_one_key() {
        assert!(matches!(
            LocalWalletProvider::new(Vec::new()),
            Err(GatewayError::InvalidPrivateKey(_))
        ));
    }

    #[tokio::test]
    async fn accounts_hidden_until_requested() {
        let key = signer(1);
        let address = key.address();
        let provider = LocalWalletProvider::new(vec![key]).unwrap();

        assert!(provider.current_accounts().await.unwrap().is_empty());
        assert_eq!(provider.request_accounts().await.unwrap(), vec![address]);
        assert_eq!(provider.current_accounts().await.unwrap(), vec![address]);
    }

    #[test]
    fn wallet_signs_for_every_exposed_account() {
        let provider = LocalWalletProvider::new(vec![signer(1), signer(2)]).unwrap();
        let wallet = provider.wallet();

        let addresses = provider.addresses();
        assert_eq!(
            NetworkWallet::<Ethereum>::default_signer_address(&wallet),
            addresses[0]
        );
        for address in &addresses {
            assert!(NetworkWallet::<Ethereum>::has_signer_for(&wallet, address));
        }
    }

    #[tokio::test]
    async fn switch_and_revoke_are_broadcast() {
        let second = signer(2).address();
        let provider = LocalWalletProvider::new(vec![signer(1), signer(2)]).unwrap();
        let mut events = provider.subscribe();

        provider.switch_account(second).unwrap();
        assert_eq!(provider.current_accounts().await.unwrap(), vec![second]);
        provider.revoke();

        assert_eq!(
            events.recv().await.unwrap(),
            ProviderEvent::AccountsChanged(vec![second])
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ProviderEvent::AccountsChanged(Vec::new())
        );
        assert!(provider.current_accounts().await.unwrap().is_empty());
    }

    #[test]
    fn switching_to_a_foreign_account_is_rejected() {
        let provider = LocalWalletProvider::new(vec![signer(1)]).unwrap();
        let mut events = provider.subscribe();

        let err = provider.switch_account(signer(3).address()).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidAddress(_)));
        assert!(events.try_recv().is_err());
    }
}
