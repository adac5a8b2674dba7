// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Enforcement Program Interface
//!
//! Client-side view of the on-chain Absent program (an Anchor program):
//! account layouts, instruction encoding, address derivation and an
//! executable model of its state machine.
//!
//! ## State machine
//!
//! Each (configuration, wallet) pair is either `UNCLAIMED` or `CLAIMED`.
//! `verify_and_award` moves it to `CLAIMED` by creating the claim account at
//! a deterministic address; account creation fails if the address is already
//! initialized, so the transition can fire at most once.
//!
//! ## Anchor conventions
//!
//! - Instruction data starts with `sha256("global:<name>")[..8]`.
//! - Account data starts with `sha256("account:<Type>")[..8]`.
//! - Fields follow in declaration order, little-endian (Borsh).

pub mod accounts;
pub mod contract;
pub mod derive;
pub mod instruction;

pub use accounts::{AccountDecodeError, ClaimRecord, ProtocolConfig, SlotWindow};
pub use contract::{AccountSet, EnforcementProgram, ProgramError};
pub use derive::{ClaimAccounts, ClaimAddressDeriver, DeriveError};
pub use instruction::AbsentInstruction;

/// PDA seed prefix of the configuration account.
pub const CONFIG_SEED: &[u8] = b"config";

/// PDA seed prefix of claim records.
pub const CLAIM_SEED: &[u8] = b"claim";

/// PDA seed of the credential mint authority.
pub const MINT_AUTHORITY_SEED: &[u8] = b"mint_auth";

/// `sha256("global:initialize")[..8]`
pub const INITIALIZE_DISCRIMINATOR: [u8; 8] = [175, 175, 109, 31, 13, 152, 155, 237];

/// `sha256("global:verify_and_award")[..8]`
pub const VERIFY_AND_AWARD_DISCRIMINATOR: [u8; 8] = [187, 129, 34, 66, 156, 155, 24, 84];

/// `sha256("account:Config")[..8]`
pub const CONFIG_ACCOUNT_DISCRIMINATOR: [u8; 8] = [155, 12, 170, 224, 30, 250, 204, 130];

/// `sha256("account:Claim")[..8]`
pub const CLAIM_ACCOUNT_DISCRIMINATOR: [u8; 8] = [155, 70, 22, 176, 123, 215, 246, 102];

/// Anchor discriminator for `namespace:name`.
pub fn anchor_discriminator(namespace: &str, name: &str) -> [u8; 8] {
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}
