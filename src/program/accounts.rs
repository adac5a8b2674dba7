// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-chain account layouts of the enforcement program.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use super::{CLAIM_ACCOUNT_DISCRIMINATOR, CONFIG_ACCOUNT_DISCRIMINATOR};

/// Inclusive slot range `[start, end]` in which absence is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotWindow {
    start: u64,
    end: u64,
}

impl SlotWindow {
    /// A window must contain at least two slots (`start < end`).
    pub fn new(start: u64, end: u64) -> Result<Self, AccountDecodeError> {
        if start >= end {
            return Err(AccountDecodeError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn contains(&self, slot: u64) -> bool {
        (self.start..=self.end).contains(&slot)
    }
}

/// The program's `Config` account.
///
/// Created once by the admin; the verifier reads it at startup and never
/// writes it.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProtocolConfig {
    pub admin: Pubkey,
    pub verifier: Pubkey,
    pub forbidden_program: Pubkey,
    pub start_slot: u64,
    pub end_slot: u64,
    pub bump: u8,
}

impl ProtocolConfig {
    /// Body size after the discriminator.
    pub const SIZE: usize = 32 + 32 + 32 + 8 + 8 + 1;

    /// Full account size including the discriminator.
    pub const ACCOUNT_LEN: usize = 8 + Self::SIZE;

    pub fn window(&self) -> Result<SlotWindow, AccountDecodeError> {
        SlotWindow::new(self.start_slot, self.end_slot)
    }

    pub fn try_from_account_data(data: &[u8]) -> Result<Self, AccountDecodeError> {
        let config: Self = decode_anchor_account(
            data,
            CONFIG_ACCOUNT_DISCRIMINATOR,
            Self::ACCOUNT_LEN,
            "Config",
        )?;
        config.window()?;
        Ok(config)
    }

    pub fn to_account_data(&self) -> Result<Vec<u8>, AccountDecodeError> {
        encode_anchor_account(self, CONFIG_ACCOUNT_DISCRIMINATOR, Self::ACCOUNT_LEN, "Config")
    }
}

/// The program's `Claim` account. Its existence is the "already claimed" fact.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ClaimRecord {
    pub user: Pubkey,
    pub config: Pubkey,
    pub proof_hash: [u8; 32],
    pub claimed: bool,
    pub bump: u8,
}

impl ClaimRecord {
    pub const SIZE: usize = 32 + 32 + 32 + 1 + 1;
    pub const ACCOUNT_LEN: usize = 8 + Self::SIZE;

    pub fn try_from_account_data(data: &[u8]) -> Result<Self, AccountDecodeError> {
        decode_anchor_account(data, CLAIM_ACCOUNT_DISCRIMINATOR, Self::ACCOUNT_LEN, "Claim")
    }

    pub fn to_account_data(&self) -> Result<Vec<u8>, AccountDecodeError> {
        encode_anchor_account(self, CLAIM_ACCOUNT_DISCRIMINATOR, Self::ACCOUNT_LEN, "Claim")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountDecodeError {
    #[error("{0} account has the wrong discriminator")]
    WrongDiscriminator(&'static str),

    #[error("{0} account data is truncated")]
    Truncated(&'static str),

    #[error("{0} account data is malformed: {1}")]
    Malformed(&'static str, String),

    #[error("{0} account did not serialize: {1}")]
    DidNotSerialize(&'static str, String),

    #[error("Invalid slot window: start {start} must be below end {end}")]
    InvalidWindow { start: u64, end: u64 },
}

/// Checks the discriminator, then Borsh-decodes the body. Bytes past the
/// declared layout are ignored.
fn decode_anchor_account<T: BorshDeserialize>(
    data: &[u8],
    discriminator: [u8; 8],
    account_len: usize,
    name: &'static str,
) -> Result<T, AccountDecodeError> {
    if data.len() < 8 {
        return Err(AccountDecodeError::Truncated(name));
    }
    if data[..8] != discriminator {
        return Err(AccountDecodeError::WrongDiscriminator(name));
    }
    if data.len() < account_len {
        return Err(AccountDecodeError::Truncated(name));
    }
    let mut body = &data[8..];
    T::deserialize(&mut body).map_err(|e| AccountDecodeError::Malformed(name, e.to_string()))
}

fn encode_anchor_account<T: BorshSerialize>(
    value: &T,
    discriminator: [u8; 8],
    account_len: usize,
    name: &'static str,
) -> Result<Vec<u8>, AccountDecodeError> {
    let mut out = Vec::with_capacity(account_len);
    out.extend_from_slice(&discriminator);
    value
        .serialize(&mut out)
        .map_err(|e| AccountDecodeError::DidNotSerialize(name, e.to_string()))?;
    Ok(out)
}
