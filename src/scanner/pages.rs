// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Newest-first paging over an address's signature history.

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;

use crate::ledger::{LedgerClient, LedgerError, SignatureInfo};

/// Lazy, finite sequence of history pages.
///
/// The cursor is the last signature returned, so a sequence can be rebuilt
/// with [`HistoryPages::resume`] and continue where it stopped. Paging ends
/// when a page is short (history exhausted) or reaches below `floor`.
/// Only the second case proves the history covering `floor` was seen; see
/// [`HistoryPages::reached_floor`].
pub struct HistoryPages {
    ledger: Arc<dyn LedgerClient>,
    address: Pubkey,
    floor: u64,
    page_size: usize,
    cursor: Option<String>,
    finished: bool,
    reached_floor: bool,
}

impl HistoryPages {
    pub fn new(ledger: Arc<dyn LedgerClient>, address: Pubkey, floor: u64, page_size: usize) -> Self {
        Self::resume(ledger, address, floor, page_size, None)
    }

    pub fn resume(
        ledger: Arc<dyn LedgerClient>,
        address: Pubkey,
        floor: u64,
        page_size: usize,
        cursor: Option<String>,
    ) -> Self {
        Self {
            ledger,
            address,
            floor,
            page_size: page_size.max(1),
            cursor,
            finished: false,
            reached_floor: false,
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// An entry older than `floor` was returned.
    pub fn reached_floor(&self) -> bool {
        self.reached_floor
    }

    /// Fetch the next page, or `None` once the sequence is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<SignatureInfo>>, LedgerError> {
        if self.finished {
            return Ok(None);
        }

        let page = self
            .ledger
            .signatures_for_address(&self.address, self.cursor.as_deref(), self.page_size)
            .await?;

        let Some(last) = page.last() else {
            self.finished = true;
            return Ok(None);
        };

        self.cursor = Some(last.signature.clone());
        self.reached_floor = last.slot < self.floor;
        if page.len() < self.page_size || self.reached_floor {
            self.finished = true;
        }

        tracing::debug!(
            address = %self.address,
            entries = page.len(),
            oldest_slot = last.slot,
            finished = self.finished,
            "Fetched history page"
        );
        Ok(Some(page))
    }
}
