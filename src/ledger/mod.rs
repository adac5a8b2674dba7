// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Client
//!
//! The verifier's only view of the chain. Everything above this module talks
//! to the [`LedgerClient`] trait, so the scanner, builder and service can run
//! against either the JSON-RPC endpoint ([`RpcLedgerClient`]) or the
//! in-process [`MemoryLedger`].
//!
//! ## Calls
//!
//! | Call | JSON-RPC method |
//! |------|-----------------|
//! | [`LedgerClient::signatures_for_address`] | `getSignaturesForAddress` |
//! | [`LedgerClient::parsed_transaction`] | `getTransaction` (`jsonParsed`) |
//! | [`LedgerClient::latest_checkpoint`] | `getLatestBlockhash` |
//! | [`LedgerClient::account`] | `getAccountInfo` |
//! | [`LedgerClient::submit_transaction`] | `sendTransaction` |
//! | [`LedgerClient::first_available_slot`] | `getFirstAvailableBlock` |

use async_trait::async_trait;
use solana_sdk::{account::Account, hash::Hash, pubkey::Pubkey, transaction::Transaction};

pub mod memory;
pub mod rpc;

pub use memory::{HistoryFault, MemoryLedger};
pub use rpc::RpcLedgerClient;

/// One entry of an address's signature history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    /// The transaction landed but its execution failed.
    pub failed: bool,
}

/// The parts of a confirmed transaction the scanner inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub signature: String,
    pub slot: u64,
    pub failed: bool,
    /// Program ids of every top-level and inner instruction, in order.
    pub invoked_programs: Vec<Pubkey>,
}

impl ParsedTransaction {
    pub fn invokes(&self, program: &Pubkey) -> bool {
        self.invoked_programs.iter().any(|p| p == program)
    }
}

/// A recent blockhash and the last block height it is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
}

impl From<Account> for AccountData {
    fn from(account: Account) -> Self {
        Self {
            owner: account.owner,
            lamports: account.lamports,
            data: account.data,
        }
    }
}

/// Read/submit access to the ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Signatures involving `address`, newest first, strictly older than
    /// `before` when given.
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, LedgerError>;

    /// `Ok(None)` when the ledger has no record of the signature.
    async fn parsed_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ParsedTransaction>, LedgerError>;

    async fn latest_checkpoint(&self) -> Result<Checkpoint, LedgerError>;

    /// `Ok(None)` when no account exists at `address`.
    async fn account(&self, address: &Pubkey) -> Result<Option<AccountData>, LedgerError>;

    /// Submit a fully signed transaction, returning its signature.
    async fn submit_transaction(&self, tx: &Transaction) -> Result<String, LedgerError>;

    /// Lowest slot the node still serves history for. Anything older has
    /// been pruned from its ledger.
    async fn first_available_slot(&self) -> Result<u64, LedgerError>;
}

/// Errors that can occur at the ledger boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC request timed out")]
    Timeout,

    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Transaction rejected: {0}")]
    Rejected(String),
}

impl LedgerError {
    /// The rejection came from creating an account that already exists.
    ///
    /// For a claim transaction this means the wallet has already claimed.
    pub fn is_account_in_use(&self) -> bool {
        matches!(self, LedgerError::Rejected(reason) if reason.contains("already in use"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_in_use_is_detected_from_rejection_text() {
        let err = LedgerError::Rejected(
            "Allocate: account Address { address: X, base: None } already in use".into(),
        );
        assert!(err.is_account_in_use());
        assert!(!LedgerError::Rejected("Blockhash not found".into()).is_account_in_use());
        assert!(!LedgerError::Timeout.is_account_in_use());
    }

    #[test]
    fn invokes_checks_every_program() {
        let forbidden = Pubkey::new_from_array([9; 32]);
        let tx = ParsedTransaction {
            signature: "sig".into(),
            slot: 10,
            failed: false,
            invoked_programs: vec![Pubkey::default(), forbidden],
        };
        assert!(tx.invokes(&forbidden));
        assert!(!tx.invokes(&Pubkey::new_from_array([8; 32])));
    }
}
