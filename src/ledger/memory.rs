// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process ledger.
//!
//! Keeps signature histories, accounts and recent blockhashes in memory and
//! executes submitted transactions against [`EnforcementProgram`]. Used by
//! the test suites and for local runs without a cluster.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use tracing::debug;

use super::{AccountData, Checkpoint, LedgerClient, LedgerError, ParsedTransaction, SignatureInfo};
use crate::program::{AccountSet, EnforcementProgram};

/// Blockhashes older than this many blocks are no longer accepted.
const MAX_RECENT_BLOCKHASHES: usize = 150;

/// Failure injected into history reads, for exercising degraded RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFault {
    /// The call never returns.
    Stall,
    /// The call fails with a transport error.
    Unavailable,
}

#[derive(Debug)]
struct HistoryEntry {
    sequence: u64,
    info: SignatureInfo,
}

#[derive(Debug, Default)]
struct LedgerState {
    slot: u64,
    block_height: u64,
    recent_blockhashes: VecDeque<Hash>,
    accounts: AccountSet,
    transactions: HashMap<String, ParsedTransaction>,
    history: HashMap<Pubkey, Vec<HistoryEntry>>,
    sequence: u64,
    first_available_slot: u64,
    history_calls: usize,
    fault: Option<(usize, HistoryFault)>,
    account_fault: bool,
}

impl LedgerState {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn push_history(&mut self, address: Pubkey, info: SignatureInfo) {
        let sequence = self.next_sequence();
        self.history
            .entry(address)
            .or_default()
            .push(HistoryEntry { sequence, info });
    }

    fn advance_block(&mut self) {
        let previous = self.recent_blockhashes.back().copied().unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(previous.to_bytes());
        hasher.update(self.block_height.to_le_bytes());
        self.recent_blockhashes
            .push_back(Hash::new_from_array(hasher.finalize().into()));
        if self.recent_blockhashes.len() > MAX_RECENT_BLOCKHASHES {
            self.recent_blockhashes.pop_front();
        }
        self.block_height += 1;
        self.slot += 1;
    }
}

/// [`LedgerClient`] backed by process memory.
#[derive(Debug)]
pub struct MemoryLedger {
    program: EnforcementProgram,
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new(program_id: Pubkey) -> Self {
        let mut state = LedgerState::default();
        state.advance_block();
        Self {
            program: EnforcementProgram::new(program_id),
            state: Mutex::new(state),
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        self.program.program_id()
    }

    pub fn current_slot(&self) -> u64 {
        self.lock().slot
    }

    /// Move the current slot forward to `slot` (never backwards).
    pub fn set_slot(&self, slot: u64) {
        let mut state = self.lock();
        state.slot = state.slot.max(slot);
    }

    /// Produce a new block, expiring the oldest blockhash past the limit.
    pub fn advance_block(&self) {
        self.lock().advance_block();
    }

    /// Record a landed transaction touching `participants` and invoking
    /// `programs`, returning its signature.
    pub fn record_transaction(
        &self,
        participants: &[Pubkey],
        slot: u64,
        programs: &[Pubkey],
        failed: bool,
    ) -> String {
        let mut state = self.lock();
        let sequence = state.next_sequence();

        let mut hasher = Sha256::new();
        hasher.update(sequence.to_le_bytes());
        hasher.update(slot.to_le_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&digest);
        bytes[32..40].copy_from_slice(&sequence.to_le_bytes());
        let signature = Signature::from(bytes).to_string();

        let info = SignatureInfo {
            signature: signature.clone(),
            slot,
            failed,
        };
        for participant in participants {
            state.push_history(*participant, info.clone());
        }
        state.transactions.insert(
            signature.clone(),
            ParsedTransaction {
                signature: signature.clone(),
                slot,
                failed,
                invoked_programs: programs.to_vec(),
            },
        );
        state.slot = state.slot.max(slot);
        signature
    }

    /// Drop the transaction body while keeping its history entries, like an
    /// RPC node that has pruned the block.
    pub fn forget_transaction(&self, signature: &str) {
        self.lock().transactions.remove(signature);
    }

    /// Pretend everything below `slot` has been pruned from history.
    pub fn set_first_available_slot(&self, slot: u64) {
        self.lock().first_available_slot = slot;
    }

    pub fn put_account(&self, address: Pubkey, account: AccountData) {
        self.lock().accounts.insert(address, account);
    }

    /// Apply `fault` to every history read after the first `after_calls`.
    pub fn inject_history_fault(&self, after_calls: usize, fault: HistoryFault) {
        let mut state = self.lock();
        state.history_calls = 0;
        state.fault = Some((after_calls, fault));
    }

    /// Make every subsequent account read fail with a transport error.
    pub fn inject_account_fault(&self) {
        self.lock().account_fault = true;
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // A poisoned lock only means another test thread panicked mid-update.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn execute(&self, tx: &Transaction) -> Result<String, LedgerError> {
        tx.verify().map_err(|e| {
            LedgerError::Rejected(format!(
                "Transaction did not pass signature verification: {e}"
            ))
        })?;

        let mut state = self.lock();
        if !state
            .recent_blockhashes
            .contains(&tx.message.recent_blockhash)
        {
            return Err(LedgerError::Rejected("Blockhash not found".to_string()));
        }

        let instructions = decompile(&tx.message)?;

        let mut staged = state.accounts.clone();
        for (index, ix) in instructions.iter().enumerate() {
            if ix.program_id != *self.program.program_id() {
                return Err(LedgerError::Rejected(format!(
                    "Error processing Instruction {index}: unsupported program {}",
                    ix.program_id
                )));
            }
            self.program.execute(&mut staged, ix).map_err(|e| {
                LedgerError::Rejected(format!("Error processing Instruction {index}: {e}"))
            })?;
        }

        let signature = tx
            .signatures
            .first()
            .map(|sig| sig.to_string())
            .ok_or_else(|| LedgerError::Rejected("transaction has no signatures".to_string()))?;

        state.accounts = staged;
        state.advance_block();
        let slot = state.slot;
        let info = SignatureInfo {
            signature: signature.clone(),
            slot,
            failed: false,
        };
        for key in &tx.message.account_keys {
            state.push_history(*key, info.clone());
        }
        let mut invoked_programs: Vec<Pubkey> =
            instructions.iter().map(|ix| ix.program_id).collect();
        invoked_programs.dedup();
        state.transactions.insert(
            signature.clone(),
            ParsedTransaction {
                signature: signature.clone(),
                slot,
                failed: false,
                invoked_programs,
            },
        );
        debug!(signature = %signature, slot, "Executed transaction");
        Ok(signature)
    }
}

/// Expands compiled instructions back into program id and account metas,
/// taking signer and writable roles from the message header.
fn decompile(message: &Message) -> Result<Vec<Instruction>, LedgerError> {
    let key = |index: u8| {
        message
            .account_keys
            .get(usize::from(index))
            .copied()
            .ok_or_else(|| {
                LedgerError::Rejected(format!("account index {index} is out of bounds"))
            })
    };
    message
        .instructions
        .iter()
        .map(|compiled| {
            let accounts = compiled
                .accounts
                .iter()
                .map(|&index| {
                    let position = usize::from(index);
                    Ok(AccountMeta {
                        pubkey: key(index)?,
                        is_signer: message.is_signer(position),
                        is_writable: message.is_maybe_writable(position, None),
                    })
                })
                .collect::<Result<Vec<_>, LedgerError>>()?;
            Ok(Instruction {
                program_id: key(compiled.program_id_index)?,
                accounts,
                data: compiled.data.clone(),
            })
        })
        .collect()
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, LedgerError> {
        let fault = {
            let mut state = self.lock();
            state.history_calls += 1;
            match state.fault {
                Some((after, fault)) if state.history_calls > after => Some(fault),
                _ => None,
            }
        };
        match fault {
            Some(HistoryFault::Stall) => std::future::pending::<()>().await,
            Some(HistoryFault::Unavailable) => {
                return Err(LedgerError::Transport("connection reset".to_string()))
            }
            None => {}
        }

        let state = self.lock();
        let mut entries: Vec<&HistoryEntry> = state
            .history
            .get(address)
            .map(|entries| entries.iter().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            b.info
                .slot
                .cmp(&a.info.slot)
                .then(b.sequence.cmp(&a.sequence))
        });

        let start = match before {
            Some(before) => entries
                .iter()
                .position(|e| e.info.signature == before)
                .map(|i| i + 1)
                .ok_or_else(|| LedgerError::Rpc {
                    code: -32602,
                    message: format!("Invalid param: unknown signature {before}"),
                })?,
            None => 0,
        };

        Ok(entries
            .into_iter()
            .skip(start)
            .take(limit)
            .map(|e| e.info.clone())
            .collect())
    }

    async fn parsed_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ParsedTransaction>, LedgerError> {
        Ok(self.lock().transactions.get(signature).cloned())
    }

    async fn latest_checkpoint(&self) -> Result<Checkpoint, LedgerError> {
        let state = self.lock();
        let blockhash = state
            .recent_blockhashes
            .back()
            .copied()
            .ok_or_else(|| LedgerError::InvalidResponse("no blocks produced".to_string()))?;
        Ok(Checkpoint {
            blockhash,
            last_valid_block_height: state.block_height + MAX_RECENT_BLOCKHASHES as u64,
        })
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<AccountData>, LedgerError> {
        let state = self.lock();
        if state.account_fault {
            return Err(LedgerError::Transport("connection reset".to_string()));
        }
        Ok(state.accounts.get(address).cloned())
    }

    async fn submit_transaction(&self, tx: &Transaction) -> Result<String, LedgerError> {
        self.execute(tx)
    }

    async fn first_available_slot(&self) -> Result<u64, LedgerError> {
        Ok(self.lock().first_available_slot)
    }
}
