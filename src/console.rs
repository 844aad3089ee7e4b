// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Interactive Console
//!
//! Line-oriented commands driving one long-lived [`WalletSession`], so the
//! ledger accumulates across deposits and withdrawals the way it does in a
//! single page of the wallet app.
//!
//! ## Commands
//!
//! | Command | Effect |
//! |---------|--------|
//! | `status` | Print the session snapshot as JSON |
//! | `connect` / `disconnect` | Connect to the provider / tear the session down |
//! | `register <username> <user-id>` | Register the connected account |
//! | `deposit <ether>` / `withdraw <ether>` | Move funds through the contract |
//! | `refresh` | Pull the balance from the contract |
//! | `history [all\|deposits\|withdrawals] [term]` | Filtered, searched ledger rows |
//! | `totals` | Deposited and withdrawn sums |
//! | `export` | Ledger in the export format |
//! | `use <address>` / `lock` | Switch the local wallet's active key / lock it |
//! | `help` / `quit` | |

use std::str::FromStr;

use alloy::primitives::Address;
use thiserror::Error;

use crate::blockchain::{GatewayError, LocalWalletProvider};
use crate::error::SessionError;
use crate::session::{Confirmed, LedgerEntry, LedgerFilter, WalletSession};

pub const HELP: &str = "commands: status | connect | disconnect | register <username> <user-id> | \
deposit <ether> | withdraw <ether> | refresh | history [all|deposits|withdrawals] [term] | \
totals | export | use <address> | lock | help | quit";

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Wallet(#[from] GatewayError),

    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Status,
    Connect,
    Disconnect,
    Register { username: String, user_id: String },
    Deposit(String),
    Withdraw(String),
    Refresh,
    History { filter: LedgerFilter, term: String },
    Totals,
    Export,
    Use(Address),
    Lock,
}

impl FromStr for Command {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["help"] => Command::Help,
            ["quit"] | ["exit"] => Command::Quit,
            ["status"] => Command::Status,
            ["connect"] => Command::Connect,
            ["disconnect"] => Command::Disconnect,
            ["register", username, user_id] => Command::Register {
                username: username.to_string(),
                user_id: user_id.to_string(),
            },
            ["deposit", amount] => Command::Deposit(amount.to_string()),
            ["withdraw", amount] => Command::Withdraw(amount.to_string()),
            ["refresh"] => Command::Refresh,
            ["history", rest @ ..] => parse_history(rest),
            ["totals"] => Command::Totals,
            ["export"] => Command::Export,
            ["use", address] => Command::Use(
                address
                    .parse()
                    .map_err(|_| ConsoleError::Usage(format!("not an address: {address}")))?,
            ),
            ["lock"] => Command::Lock,
            _ => return Err(ConsoleError::Usage(HELP.to_string())),
        };
        Ok(command)
    }
}

/// The first word is a filter if it names one; everything else is the term.
fn parse_history(rest: &[&str]) -> Command {
    match rest.split_first() {
        Some((first, tail)) => match first.parse::<LedgerFilter>() {
            Ok(filter) => Command::History {
                filter,
                term: tail.join(" "),
            },
            Err(_) => Command::History {
                filter: LedgerFilter::All,
                term: rest.join(" "),
            },
        },
        None => Command::History {
            filter: LedgerFilter::All,
            term: String::new(),
        },
    }
}

/// Run `command` against `session` and render its output.
///
/// `wallet` is the local key store behind the session's provider, if the
/// session has one; `use` and `lock` need it.
pub async fn execute(
    session: &WalletSession,
    wallet: Option<&LocalWalletProvider>,
    command: Command,
) -> Result<String, ConsoleError> {
    let output = match command {
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
        Command::Status => serde_json::to_string_pretty(&session.snapshot().await)?,
        Command::Connect => format!("{:?}", session.connect().await?),
        Command::Disconnect => {
            session.disconnect().await;
            "disconnected".to_string()
        }
        Command::Register { username, user_id } => {
            let confirmed = session.register(&username, &user_id).await?;
            let line = format!(
                "registered {} ({}) in {}",
                confirmed.value.username, confirmed.value.user_id, confirmed.receipt.tx_hash
            );
            with_balance_warning(line, &confirmed)
        }
        Command::Deposit(amount) => confirmed_transfer(session.deposit(&amount).await?),
        Command::Withdraw(amount) => confirmed_transfer(session.withdraw(&amount).await?),
        Command::Refresh => format!("balance {}", session.refresh_balance().await?),
        Command::History { filter, term } => session
            .view_transactions(filter, &term)
            .await
            .iter()
            .map(render_entry)
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Totals => {
            let totals = session.totals().await;
            format!(
                "deposited {} withdrawn {}",
                totals.deposited_ether(),
                totals.withdrawn_ether()
            )
        }
        Command::Export => session.export_transactions().await,
        Command::Use(address) => {
            require_wallet(wallet)?.switch_account(address)?;
            format!("switched to {address}")
        }
        Command::Lock => {
            require_wallet(wallet)?.revoke();
            "wallet locked".to_string()
        }
    };
    Ok(output)
}

fn require_wallet(wallet: Option<&LocalWalletProvider>) -> Result<&LocalWalletProvider, ConsoleError> {
    wallet.ok_or_else(|| ConsoleError::Usage("no local wallet configured".to_string()))
}

fn confirmed_transfer(confirmed: Confirmed<LedgerEntry>) -> String {
    let line = format!(
        "{} {} confirmed in {}, balance {}",
        confirmed.value.kind(),
        confirmed.value.amount(),
        confirmed.receipt.tx_hash,
        confirmed.balance
    );
    with_balance_warning(line, &confirmed)
}

fn with_balance_warning<T>(line: String, confirmed: &Confirmed<T>) -> String {
    match &confirmed.balance_error {
        Some(e) => format!("{line}\nwarning: balance not refreshed: {e}"),
        None => line,
    }
}

fn render_entry(entry: &LedgerEntry) -> String {
    format!("{:<8} {:>12} {}", entry.kind().as_str(), entry.amount(), entry.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transfers_and_registration() {
        assert_eq!(
            "deposit 1.5".parse::<Command>().unwrap(),
            Command::Deposit("1.5".into())
        );
        assert_eq!(
            "  register alice 42 ".parse::<Command>().unwrap(),
            Command::Register {
                username: "alice".into(),
                user_id: "42".into()
            }
        );
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn history_filter_is_optional() {
        assert_eq!(
            "history".parse::<Command>().unwrap(),
            Command::History {
                filter: LedgerFilter::All,
                term: String::new()
            }
        );
        assert_eq!(
            "history deposits 1.5".parse::<Command>().unwrap(),
            Command::History {
                filter: LedgerFilter::Deposits,
                term: "1.5".into()
            }
        );
        assert_eq!(
            "history 2026-10".parse::<Command>().unwrap(),
            Command::History {
                filter: LedgerFilter::All,
                term: "2026-10".into()
            }
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!("deposit".parse::<Command>(), Err(ConsoleError::Usage(_))));
        assert!(matches!("use nowhere".parse::<Command>(), Err(ConsoleError::Usage(_))));
        assert!(matches!("".parse::<Command>(), Err(ConsoleError::Usage(_))));
    }

    #[test]
    fn parses_wallet_switch() {
        let address = Address::repeat_byte(0x11);
        assert_eq!(
            format!("use {address}").parse::<Command>().unwrap(),
            Command::Use(address)
        );
    }
}
