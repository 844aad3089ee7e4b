// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local ledger of confirmed deposits and withdrawals.
//!
//! ## Invariants
//!
//! - Append-only: entries are never reordered, edited or removed, except by
//!   a full session reset.
//! - Order is completion order.
//! - Filtered and searched views are computed from the full ledger on
//!   demand and never replace it.
//!
//! ## Export Format
//!
//! ```text
//! type,amount,date
//! deposit,1.5,2026-10-19T12:00:00.000Z
//! withdraw,0.5,2026-10-19T12:05:00.000Z
//! ```
//!
//! Rows are joined by `\n` with no trailing newline. Amounts are canonical
//! decimal ether; dates are RFC 3339 UTC with milliseconds.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;

use crate::blockchain::{format_ether, parse_ether};
use crate::error::Operation;

/// Header row of the export format.
pub const EXPORT_HEADER: &str = "type,amount,date";

/// Human-readable timestamp form that search also matches against.
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            TransactionKind::Deposit => Operation::Deposit,
            TransactionKind::Withdraw => Operation::Withdraw,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ExportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" => Ok(TransactionKind::Withdraw),
            other => Err(ExportParseError::UnknownKind(other.to_string())),
        }
    }
}

/// A confirmed deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    kind: TransactionKind,
    amount: String,
    #[serde(skip)]
    amount_wei: U256,
    timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    /// Build an entry; the timestamp is truncated to milliseconds so that
    /// the export encoding is lossless.
    pub fn new(kind: TransactionKind, amount_wei: U256, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            amount: format_ether(amount_wei),
            amount_wei,
            timestamp: timestamp.trunc_subsecs(3),
        }
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Canonical decimal ether amount.
    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn amount_wei(&self) -> U256 {
        self.amount_wei
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Timestamp in the export encoding.
    pub fn date(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn matches_term(&self, needle: &str) -> bool {
        self.amount.to_lowercase().contains(needle)
            || self.kind.as_str().contains(needle)
            || self.date().to_lowercase().contains(needle)
            || self
                .timestamp
                .format(DISPLAY_FORMAT)
                .to_string()
                .contains(needle)
    }

    fn to_row(&self) -> String {
        format!("{},{},{}", self.kind, self.amount, self.date())
    }
}

/// Type filter offered to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LedgerFilter {
    #[default]
    All,
    Deposits,
    Withdrawals,
}

impl LedgerFilter {
    pub fn accepts(&self, entry: &LedgerEntry) -> bool {
        match self {
            LedgerFilter::All => true,
            LedgerFilter::Deposits => entry.kind == TransactionKind::Deposit,
            LedgerFilter::Withdrawals => entry.kind == TransactionKind::Withdraw,
        }
    }
}

impl FromStr for LedgerFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(LedgerFilter::All),
            "deposit" | "deposits" => Ok(LedgerFilter::Deposits),
            "withdraw" | "withdrawals" => Ok(LedgerFilter::Withdrawals),
            other => Err(format!("unknown filter `{other}`")),
        }
    }
}

/// Sum of deposits and withdrawals recorded this session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub deposited: U256,
    pub withdrawn: U256,
}

impl LedgerTotals {
    pub fn deposited_ether(&self) -> String {
        format_ether(self.deposited)
    }

    pub fn withdrawn_ether(&self) -> String {
        format_ether(self.withdrawn)
    }
}

/// Append-only record of confirmed transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionLedger {
    entries: Vec<LedgerEntry>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a confirmed transaction stamped with the current time.
    pub fn record_completed(&mut self, kind: TransactionKind, amount_wei: U256) -> LedgerEntry {
        self.record_completed_at(kind, amount_wei, Utc::now())
    }

    /// Append a confirmed transaction with an explicit completion time.
    pub fn record_completed_at(
        &mut self,
        kind: TransactionKind,
        amount_wei: U256,
        at: DateTime<Utc>,
    ) -> LedgerEntry {
        let entry = LedgerEntry::new(kind, amount_wei, at);
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries accepted by `predicate`, in ledger order.
    pub fn filter<F>(&self, predicate: F) -> Vec<LedgerEntry>
    where
        F: Fn(&LedgerEntry) -> bool,
    {
        self.entries
            .iter()
            .filter(|entry| predicate(entry))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search over amount, kind and timestamp.
    /// A blank term returns the whole ledger.
    pub fn search(&self, term: &str) -> Vec<LedgerEntry> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.entries.clone();
        }
        self.filter(|entry| entry.matches_term(&needle))
    }

    /// Type filter followed by search.
    pub fn view(&self, filter: LedgerFilter, term: &str) -> Vec<LedgerEntry> {
        let needle = term.trim().to_lowercase();
        self.filter(|entry| {
            filter.accepts(entry) && (needle.is_empty() || entry.matches_term(&needle))
        })
    }

    pub fn totals(&self) -> LedgerTotals {
        self.entries
            .iter()
            .fold(LedgerTotals::default(), |mut totals, entry| {
                match entry.kind {
                    TransactionKind::Deposit => {
                        totals.deposited = totals.deposited.saturating_add(entry.amount_wei)
                    }
                    TransactionKind::Withdraw => {
                        totals.withdrawn = totals.withdrawn.saturating_add(entry.amount_wei)
                    }
                }
                totals
            })
    }

    /// Render the ledger in the export format.
    pub fn export(&self) -> String {
        std::iter::once(EXPORT_HEADER.to_string())
            .chain(self.entries.iter().map(LedgerEntry::to_row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Errors reading an export back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportParseError {
    #[error("missing or unexpected header row")]
    BadHeader,

    #[error("line {line}: expected 3 columns, found {found}")]
    ColumnCount { line: usize, found: usize },

    #[error("unknown transaction type `{0}`")]
    UnknownKind(String),

    #[error("line {line}: invalid amount: {message}")]
    BadAmount { line: usize, message: String },

    #[error("line {line}: invalid date: {message}")]
    BadDate { line: usize, message: String },
}

/// Parse the output of [`TransactionLedger::export`].
pub fn parse_export(text: &str) -> Result<Vec<LedgerEntry>, ExportParseError> {
    let mut lines = text.lines();
    if lines.next().map(str::trim) != Some(EXPORT_HEADER) {
        return Err(ExportParseError::BadHeader);
    }

    lines
        .enumerate()
        .filter(|(_, row)| !row.trim().is_empty())
        .map(|(index, row)| {
            let line = index + 2;
            let columns: Vec<&str> = row.split(',').collect();
            let [kind, amount, date] = columns.as_slice() else {
                return Err(ExportParseError::ColumnCount {
                    line,
                    found: columns.len(),
                });
            };

            let kind = kind.trim().parse::<TransactionKind>()?;
            let amount_wei = parse_ether(amount).map_err(|e| ExportParseError::BadAmount {
                line,
                message: e.to_string(),
            })?;
            let timestamp = DateTime::parse_from_rfc3339(date.trim())
                .map_err(|e| ExportParseError::BadDate {
                    line,
                    message: e.to_string(),
                })?
                .with_timezone(&Utc);

            Ok(LedgerEntry::new(kind, amount_wei, timestamp))
        })
        .collect()
}
