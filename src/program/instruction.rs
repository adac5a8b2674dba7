// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Instruction builders and decoders for the enforcement program.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use super::{ClaimAccounts, INITIALIZE_DISCRIMINATOR, VERIFY_AND_AWARD_DISCRIMINATOR};

/// Number of accounts `verify_and_award` takes.
pub const VERIFY_AND_AWARD_ACCOUNTS: usize = 11;

/// Number of accounts `initialize` takes.
pub const INITIALIZE_ACCOUNTS: usize = 3;

/// Decoded instruction arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentInstruction {
    Initialize {
        verifier: Pubkey,
        forbidden_program: Pubkey,
        start_slot: u64,
        end_slot: u64,
    },
    VerifyAndAward {
        proof_hash: [u8; 32],
    },
}

#[derive(BorshSerialize, BorshDeserialize)]
struct InitializeArgs {
    verifier: Pubkey,
    forbidden_program: Pubkey,
    start_slot: u64,
    end_slot: u64,
}

impl AbsentInstruction {
    /// Decodes Anchor instruction data. Trailing bytes are rejected.
    pub fn unpack(data: &[u8]) -> Option<Self> {
        let (discriminator, args) = data.split_at_checked(8)?;
        if discriminator == INITIALIZE_DISCRIMINATOR {
            let args = InitializeArgs::try_from_slice(args).ok()?;
            return Some(Self::Initialize {
                verifier: args.verifier,
                forbidden_program: args.forbidden_program,
                start_slot: args.start_slot,
                end_slot: args.end_slot,
            });
        }
        if discriminator == VERIFY_AND_AWARD_DISCRIMINATOR {
            return Some(Self::VerifyAndAward {
                proof_hash: <[u8; 32]>::try_from_slice(args).ok()?,
            });
        }
        None
    }
}

/// `initialize(verifier, forbidden_program, start_slot, end_slot)`, signed by `admin`.
pub fn initialize(
    program_id: &Pubkey,
    admin: &Pubkey,
    config: &Pubkey,
    verifier: &Pubkey,
    forbidden_program: &Pubkey,
    start_slot: u64,
    end_slot: u64,
) -> Instruction {
    let args = InitializeArgs {
        verifier: *verifier,
        forbidden_program: *forbidden_program,
        start_slot,
        end_slot,
    };
    Instruction::new_with_borsh(
        *program_id,
        &(INITIALIZE_DISCRIMINATOR, args),
        vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(*config, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

/// `verify_and_award(proof_hash)`.
///
/// Signers: `user` (fee payer), `verifier` (attestation) and `award_mint`
/// (the credential account being created).
pub fn verify_and_award(
    program_id: &Pubkey,
    user: &Pubkey,
    verifier: &Pubkey,
    award_mint: &Pubkey,
    accounts: &ClaimAccounts,
    proof_hash: [u8; 32],
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &(VERIFY_AND_AWARD_DISCRIMINATOR, proof_hash),
        vec![
            AccountMeta::new(*user, true),
            AccountMeta::new_readonly(*verifier, true),
            AccountMeta::new_readonly(accounts.config, false),
            AccountMeta::new(accounts.claim, false),
            AccountMeta::new_readonly(accounts.mint_authority, false),
            AccountMeta::new(*award_mint, true),
            AccountMeta::new(accounts.user_token_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account_client::program::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
    )
}
