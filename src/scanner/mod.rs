// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # History Scanner
//!
//! Decides whether a wallet interacted with the forbidden program inside the
//! slot window.
//!
//! ## Strategy
//!
//! 1. Page the wallet's signatures newest-first ([`HistoryPages`]) until the
//!    pages fall below the window start or history runs out.
//! 2. For every in-window signature, fetch the parsed transaction and look for
//!    the forbidden program among top-level and inner instructions. Fetches
//!    within a page run concurrently; the first match aborts the rest.
//! 3. Any ledger failure, or a signature whose transaction cannot be
//!    retrieved, fails the scan. Absence is only ever reported after the
//!    whole window was examined.
//! 4. If history ran out before reaching the window start, the node's first
//!    available slot must not be above it; otherwise older entries may have
//!    been pruned and the scan fails.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::task::JoinSet;

use solana_sdk::pubkey::Pubkey;

use crate::ledger::{LedgerClient, LedgerError, SignatureInfo};
use crate::program::SlotWindow;

pub mod pages;

pub use pages::HistoryPages;

/// Maximum `limit` accepted by `getSignaturesForAddress`.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const DEFAULT_CONCURRENCY: usize = 8;

const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// How transactions that landed but failed are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailedTransactionPolicy {
    /// A failed transaction addressing the forbidden program is still an interaction.
    #[default]
    Count,
    /// Failed transactions are skipped.
    Ignore,
}

impl FromStr for FailedTransactionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!("expected `count` or `ignore`, got `{other}`")),
        }
    }
}

impl fmt::Display for FailedTransactionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => f.write_str("count"),
            Self::Ignore => f.write_str("ignore"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub page_size: usize,
    pub concurrency: usize,
    pub deadline: Duration,
    pub failed_transactions: FailedTransactionPolicy,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            deadline: DEFAULT_DEADLINE,
            failed_transactions: FailedTransactionPolicy::Count,
        }
    }
}

/// The transaction that disqualified the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub signature: String,
    pub slot: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub absent: bool,
    /// In-window signatures inspected before the verdict was reached.
    pub examined: u64,
    pub violation: Option<Violation>,
}

pub struct HistoryScanner {
    ledger: Arc<dyn LedgerClient>,
    settings: ScanSettings,
}

impl HistoryScanner {
    pub fn new(ledger: Arc<dyn LedgerClient>, settings: ScanSettings) -> Self {
        Self { ledger, settings }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Scan `wallet`'s history in `window` for `forbidden`, within the deadline.
    pub async fn scan(
        &self,
        wallet: &Pubkey,
        forbidden: &Pubkey,
        window: SlotWindow,
    ) -> Result<Verdict, ScanError> {
        tokio::time::timeout(self.settings.deadline, self.scan_window(wallet, forbidden, window))
            .await
            .map_err(|_| ScanError::DeadlineExceeded(self.settings.deadline))?
    }

    async fn scan_window(
        &self,
        wallet: &Pubkey,
        forbidden: &Pubkey,
        window: SlotWindow,
    ) -> Result<Verdict, ScanError> {
        let mut pages = HistoryPages::new(
            Arc::clone(&self.ledger),
            *wallet,
            window.start(),
            self.settings.page_size,
        );
        let mut examined = 0u64;

        while let Some(page) = pages.next_page().await? {
            let candidates: Vec<SignatureInfo> = page
                .into_iter()
                .filter(|info| window.contains(info.slot))
                .filter(|info| {
                    !(info.failed
                        && self.settings.failed_transactions == FailedTransactionPolicy::Ignore)
                })
                .collect();
            examined += candidates.len() as u64;

            if let Some(violation) = self.inspect(candidates, forbidden).await? {
                tracing::debug!(
                    wallet = %wallet,
                    signature = %violation.signature,
                    slot = violation.slot,
                    "Forbidden interaction found"
                );
                return Ok(Verdict {
                    absent: false,
                    examined,
                    violation: Some(violation),
                });
            }
        }

        if !pages.reached_floor() {
            let first_available = self.ledger.first_available_slot().await?;
            if first_available > window.start() {
                return Err(ScanError::HistoryPruned {
                    first_available,
                    start: window.start(),
                });
            }
        }

        Ok(Verdict {
            absent: true,
            examined,
            violation: None,
        })
    }

    /// Fetch and inspect one page of candidates with bounded concurrency.
    async fn inspect(
        &self,
        candidates: Vec<SignatureInfo>,
        forbidden: &Pubkey,
    ) -> Result<Option<Violation>, ScanError> {
        let limit = self.settings.concurrency.max(1);
        let mut queue = candidates.into_iter();
        let mut in_flight = JoinSet::new();

        loop {
            while in_flight.len() < limit {
                let Some(info) = queue.next() else { break };
                let ledger = Arc::clone(&self.ledger);
                let forbidden = *forbidden;
                let policy = self.settings.failed_transactions;
                in_flight.spawn(async move { inspect_one(ledger, info, forbidden, policy).await });
            }

            let Some(joined) = in_flight.join_next().await else {
                return Ok(None);
            };
            // Dropping the set on an early return aborts the remaining fetches.
            if let Some(violation) = joined.map_err(|e| ScanError::Task(e.to_string()))?? {
                in_flight.abort_all();
                return Ok(Some(violation));
            }
        }
    }
}

async fn inspect_one(
    ledger: Arc<dyn LedgerClient>,
    info: SignatureInfo,
    forbidden: Pubkey,
    policy: FailedTransactionPolicy,
) -> Result<Option<Violation>, ScanError> {
    let tx = ledger
        .parsed_transaction(&info.signature)
        .await?
        .ok_or_else(|| ScanError::MissingTransaction(info.signature.clone()))?;

    if tx.failed && policy == FailedTransactionPolicy::Ignore {
        return Ok(None);
    }
    Ok(tx.invokes(&forbidden).then(|| Violation {
        signature: info.signature,
        slot: info.slot,
    }))
}

/// Reasons a scan could not reach a verdict.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Transaction {0} is listed in history but could not be retrieved")]
    MissingTransaction(String),

    #[error("Ledger history starts at slot {first_available}, after window start {start}")]
    HistoryPruned { first_available: u64, start: u64 },

    #[error("Scan did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Scan task failed: {0}")]
    Task(String),
}
