// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{process::ExitCode, sync::Arc};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use wallet_balance_tracker::{
    blockchain::{
        client::{connect_read_only, connect_with_wallet, create_signer},
        ChainWatcher, ContractGateway, LocalWalletProvider, ProviderGateway, TrackerContract,
    },
    config::SessionConfig,
    console::{self, Command, HELP},
    logging::init_logging,
    WalletSession,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "wallet-tracker failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BoxError> {
    let config = SessionConfig::from_env()?;
    tracing::info!(rpc_url = %config.rpc_url, "Starting wallet tracker");

    let shutdown = CancellationToken::new();

    let wallet = if config.private_keys.is_empty() {
        tracing::warn!("WALLET_PRIVATE_KEY not set, running without a signing provider");
        None
    } else {
        let signers = config
            .private_keys
            .iter()
            .map(|key| create_signer(key))
            .collect::<Result<Vec<_>, _>>()?;
        let wallet = LocalWalletProvider::new(signers)?;
        tracing::info!(accounts = ?wallet.addresses(), "Local wallet loaded");
        Some(Arc::new(wallet))
    };

    let rpc = match &wallet {
        Some(wallet) => connect_with_wallet(&config.rpc_url, wallet.wallet())?,
        None => connect_read_only(&config.rpc_url)?,
    };

    if let Some(wallet) = &wallet {
        let watcher = ChainWatcher::new(rpc.clone(), wallet.event_sender())
            .with_poll_interval(config.chain_poll_interval);
        tokio::spawn(watcher.run(shutdown.clone()));
    }

    let contract = TrackerContract::new(rpc, &config.contract_address, config.confirmation_timeout)?;
    tracing::info!(contract = %contract.address(), "Tracker contract bound");

    let provider = wallet
        .clone()
        .map(|wallet| wallet as Arc<dyn ProviderGateway>);
    let contract: Arc<dyn ContractGateway> = Arc::new(contract);
    let session = Arc::new(WalletSession::new(provider, contract));
    tokio::spawn(session.clone().run_events(shutdown.clone()));

    if let Err(e) = session.connect().await {
        eprintln!("not connected: {e}");
    }
    println!("{HELP}");

    let result = repl(&session, wallet.as_deref(), &shutdown).await;
    shutdown.cancel();
    result
}

/// Read commands from stdin until EOF, `quit` or Ctrl+C.
async fn repl(
    session: &WalletSession,
    wallet: Option<&LocalWalletProvider>,
    shutdown: &CancellationToken,
) -> Result<(), BoxError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                return Ok(());
            }
            _ = shutdown.cancelled() => return Ok(()),
        };
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(Command::Quit) => return Ok(()),
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match console::execute(session, wallet, command).await {
            Ok(output) if output.is_empty() => {}
            Ok(output) => println!("{output}"),
            Err(e) => eprintln!("error: {e}"),
        }
    }
}
