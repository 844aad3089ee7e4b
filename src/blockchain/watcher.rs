// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Chain Watcher
//!
//! Background task that polls the node's chain id and broadcasts
//! [`ProviderEvent::NetworkChanged`] whenever it moves away from the chain
//! the watcher last saw.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, same as every other
//! background loop in this crate.

use std::time::Duration;

use alloy::providers::{DynProvider, Provider};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::types::{network_for_chain, ProviderEvent};

/// Default interval between chain id polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls the chain id and reports network switches.
pub struct ChainWatcher {
    provider: DynProvider,
    events: broadcast::Sender<ProviderEvent>,
    poll_interval: Duration,
    last_chain_id: Option<u64>,
}

impl ChainWatcher {
    /// Create a watcher publishing into `events`.
    pub fn new(provider: DynProvider, events: broadcast::Sender<ProviderEvent>) -> Self {
        Self {
            provider,
            events,
            poll_interval: DEFAULT_POLL_INTERVAL,
            last_chain_id: None,
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the watcher loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(watcher.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            "Chain watcher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("Chain watcher shutting down");
                return;
            }

            match self.provider.get_chain_id().await {
                Ok(chain_id) => {
                    let previous = self.last_chain_id;
                    if self.observe(chain_id) {
                        tracing::warn!(
                            from = previous.map_or("unknown", network_name),
                            to = network_name(chain_id),
                            chain_id,
                            "Network changed"
                        );
                        let _ = self.events.send(ProviderEvent::NetworkChanged);
                    } else if previous.is_none() {
                        tracing::info!(network = network_name(chain_id), chain_id, "Watching chain");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Chain id poll failed, will retry");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    tracing::info!("Chain watcher shutting down");
                    return;
                }
            }
        }
    }

    /// Record a chain id reading; returns true when it differs from the
    /// previous one. The first reading only sets the baseline.
    fn observe(&mut self, chain_id: u64) -> bool {
        let changed = matches!(self.last_chain_id, Some(previous) if previous != chain_id);
        self.last_chain_id = Some(chain_id);
        changed
    }
}

/// Display name of a known chain, or `"unknown"`.
fn network_name(chain_id: u64) -> &'static str {
    network_for_chain(chain_id).map_or("unknown", |network| network.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::client::connect_read_only;

    fn watcher() -> (ChainWatcher, broadcast::Receiver<ProviderEvent>) {
        let provider = connect_read_only("http://127.0.0.1:8545").unwrap();
        let (tx, rx) = broadcast::channel(4);
        (ChainWatcher::new(provider, tx), rx)
    }

    #[test]
    fn first_reading_is_baseline() {
        let (mut watcher, _rx) = watcher();
        assert!(!watcher.observe(31337));
        assert!(!watcher.observe(31337));
        assert!(watcher.observe(11155111));
        assert!(!watcher.observe(11155111));
    }

    #[test]
    fn names_known_networks() {
        assert_eq!(network_name(31337), "Local Devnet");
        assert_eq!(network_name(11155111), "Sepolia Testnet");
        assert_eq!(network_name(56), "unknown");
    }

    #[tokio::test]
    async fn cancelled_watcher_returns_immediately() {
        let (watcher, _rx) = watcher();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        watcher.run(shutdown).await;
    }
}
