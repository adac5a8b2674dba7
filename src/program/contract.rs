// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Executable model of the enforcement program.
//!
//! [`EnforcementProgram::execute`] applies one instruction to an account set
//! with the same checks the on-chain program performs. The caller stages the
//! account set and commits it only when every instruction of a transaction
//! succeeds, which gives the all-or-nothing behavior of the runtime.

use std::collections::BTreeMap;

use super::{
    instruction::{AbsentInstruction, INITIALIZE_ACCOUNTS, VERIFY_AND_AWARD_ACCOUNTS},
    ClaimAddressDeriver, ClaimRecord, ProtocolConfig, SlotWindow, CONFIG_SEED,
};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    rent::Rent,
    system_program, sysvar,
};
use spl_associated_token_account_client::address::get_associated_token_address;
use spl_token::{
    solana_program::{program_option::COption, program_pack::Pack},
    state::{Account as TokenAccount, AccountState, Mint},
};

use crate::ledger::AccountData;

/// Account set an instruction executes against.
pub type AccountSet = BTreeMap<Pubkey, AccountData>;

#[derive(Debug, Clone, Copy)]
pub struct EnforcementProgram {
    deriver: ClaimAddressDeriver,
}

impl EnforcementProgram {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            deriver: ClaimAddressDeriver::new(program_id),
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        self.deriver.program_id()
    }

    pub fn execute(&self, accounts: &mut AccountSet, ix: &Instruction) -> Result<(), ProgramError> {
        if ix.program_id != *self.program_id() {
            return Err(ProgramError::IncorrectProgramId);
        }
        match AbsentInstruction::unpack(&ix.data).ok_or(ProgramError::InvalidInstructionData)? {
            AbsentInstruction::Initialize {
                verifier,
                forbidden_program,
                start_slot,
                end_slot,
            } => self.initialize(
                accounts,
                &ix.accounts,
                verifier,
                forbidden_program,
                start_slot,
                end_slot,
            ),
            AbsentInstruction::VerifyAndAward { proof_hash } => {
                self.verify_and_award(accounts, &ix.accounts, proof_hash)
            }
        }
    }

    fn initialize(
        &self,
        accounts: &mut AccountSet,
        metas: &[AccountMeta],
        verifier: Pubkey,
        forbidden_program: Pubkey,
        start_slot: u64,
        end_slot: u64,
    ) -> Result<(), ProgramError> {
        let [admin, config, system_program] = take_accounts::<INITIALIZE_ACCOUNTS>(metas)?;

        require_signer(admin)?;
        require_writable(config, "config")?;
        require_program(system_program, &system_program::id(), "system_program")?;

        let (expected, bump) = self
            .deriver
            .config_address(&admin.pubkey)
            .map_err(|_| ProgramError::ConstraintSeeds("config"))?;
        if config.pubkey != expected {
            return Err(ProgramError::ConstraintSeeds("config"));
        }
        require_unused(accounts, &config.pubkey)?;

        SlotWindow::new(start_slot, end_slot).map_err(|_| ProgramError::InvalidContextWindow)?;

        let state = ProtocolConfig {
            admin: admin.pubkey,
            verifier,
            forbidden_program,
            start_slot,
            end_slot,
            bump,
        };
        let data = state
            .to_account_data()
            .map_err(|_| ProgramError::AccountDidNotSerialize("config"))?;
        create_account(accounts, config.pubkey, *self.program_id(), data);
        Ok(())
    }

    fn verify_and_award(
        &self,
        accounts: &mut AccountSet,
        metas: &[AccountMeta],
        proof_hash: [u8; 32],
    ) -> Result<(), ProgramError> {
        let [user, verifier, config, claim, mint_authority, award_mint, user_ata, token_program, associated_token_program, system_program, rent] =
            take_accounts::<VERIFY_AND_AWARD_ACCOUNTS>(metas)?;

        require_signer(user)?;
        require_writable(user, "user")?;
        require_program(token_program, &spl_token::id(), "token_program")?;
        require_program(
            associated_token_program,
            &spl_associated_token_account_client::program::id(),
            "associated_token_program",
        )?;
        require_program(system_program, &system_program::id(), "system_program")?;
        require_program(rent, &sysvar::rent::id(), "rent")?;

        // The configuration is the source of truth for window and forbidden program.
        let cfg = self.load_config(accounts, &config.pubkey)?;

        if verifier.pubkey != cfg.verifier {
            return Err(ProgramError::InvalidVerifier);
        }
        if !verifier.is_signer {
            return Err(ProgramError::VerifierMustSign);
        }

        require_writable(claim, "claim")?;
        let (expected_claim, claim_bump) = self
            .deriver
            .claim_address(
                &config.pubkey,
                &user.pubkey,
                cfg.start_slot,
                cfg.end_slot,
                &cfg.forbidden_program,
            )
            .map_err(|_| ProgramError::ConstraintSeeds("claim"))?;
        if claim.pubkey != expected_claim {
            return Err(ProgramError::ConstraintSeeds("claim"));
        }
        require_unused(accounts, &claim.pubkey)?;

        let (expected_authority, _) = self
            .deriver
            .mint_authority(&config.pubkey)
            .map_err(|_| ProgramError::ConstraintSeeds("mint_authority"))?;
        if mint_authority.pubkey != expected_authority {
            return Err(ProgramError::ConstraintSeeds("mint_authority"));
        }

        require_signer(award_mint)?;
        require_writable(award_mint, "award_mint")?;
        require_unused(accounts, &award_mint.pubkey)?;

        require_writable(user_ata, "user_ata")?;
        let expected_ata = get_associated_token_address(&user.pubkey, &award_mint.pubkey);
        if user_ata.pubkey != expected_ata {
            return Err(ProgramError::ConstraintSeeds("user_ata"));
        }
        require_unused(accounts, &user_ata.pubkey)?;

        let record = ClaimRecord {
            user: user.pubkey,
            config: config.pubkey,
            proof_hash,
            claimed: true,
            bump: claim_bump,
        };
        let record = record
            .to_account_data()
            .map_err(|_| ProgramError::AccountDidNotSerialize("claim"))?;
        create_account(accounts, claim.pubkey, *self.program_id(), record);

        let mint = Mint {
            mint_authority: COption::Some(mint_authority.pubkey),
            supply: 1,
            decimals: 0,
            is_initialized: true,
            freeze_authority: COption::Some(mint_authority.pubkey),
        };
        let mint = pack_token_state(mint, "award_mint")?;
        create_account(accounts, award_mint.pubkey, spl_token::id(), mint);

        let holding = TokenAccount {
            mint: award_mint.pubkey,
            owner: user.pubkey,
            amount: 1,
            delegate: COption::None,
            state: AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        let holding = pack_token_state(holding, "user_ata")?;
        create_account(accounts, user_ata.pubkey, spl_token::id(), holding);

        Ok(())
    }

    fn load_config(
        &self,
        accounts: &AccountSet,
        address: &Pubkey,
    ) -> Result<ProtocolConfig, ProgramError> {
        let account = accounts
            .get(address)
            .ok_or(ProgramError::AccountNotInitialized("config"))?;
        if account.owner != *self.program_id() {
            return Err(ProgramError::AccountOwnedByWrongProgram("config"));
        }
        let cfg = ProtocolConfig::try_from_account_data(&account.data)
            .map_err(|_| ProgramError::AccountDidNotDeserialize("config"))?;

        let expected = Pubkey::create_program_address(
            &[CONFIG_SEED, cfg.admin.as_ref(), &[cfg.bump]],
            self.program_id(),
        )
        .map_err(|_| ProgramError::ConstraintSeeds("config"))?;
        if *address != expected {
            return Err(ProgramError::ConstraintSeeds("config"));
        }
        Ok(cfg)
    }
}

fn take_accounts<const N: usize>(metas: &[AccountMeta]) -> Result<[&AccountMeta; N], ProgramError> {
    let slice = metas.get(..N).ok_or(ProgramError::NotEnoughAccountKeys)?;
    let mut out = [&slice[0]; N];
    for (slot, meta) in out.iter_mut().zip(slice) {
        *slot = meta;
    }
    Ok(out)
}

fn require_signer(meta: &AccountMeta) -> Result<(), ProgramError> {
    if meta.is_signer {
        Ok(())
    } else {
        Err(ProgramError::MissingRequiredSignature(meta.pubkey))
    }
}

fn require_writable(meta: &AccountMeta, name: &'static str) -> Result<(), ProgramError> {
    if meta.is_writable {
        Ok(())
    } else {
        Err(ProgramError::AccountNotMutable(name))
    }
}

fn require_program(
    meta: &AccountMeta,
    expected: &Pubkey,
    name: &'static str,
) -> Result<(), ProgramError> {
    if meta.pubkey == *expected {
        Ok(())
    } else {
        Err(ProgramError::InvalidProgramId(name))
    }
}

fn require_unused(accounts: &AccountSet, address: &Pubkey) -> Result<(), ProgramError> {
    if accounts.contains_key(address) {
        Err(ProgramError::AccountAlreadyInUse(*address))
    } else {
        Ok(())
    }
}

fn pack_token_state<T: Pack>(state: T, name: &'static str) -> Result<Vec<u8>, ProgramError> {
    let mut data = vec![0; T::LEN];
    T::pack(state, &mut data).map_err(|_| ProgramError::AccountDidNotSerialize(name))?;
    Ok(data)
}

fn create_account(accounts: &mut AccountSet, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
    accounts.insert(
        address,
        AccountData {
            owner,
            lamports: Rent::default().minimum_balance(data.len()),
            data,
        },
    );
}

/// Failures the program (or the runtime on its behalf) reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("Incorrect program id for instruction")]
    IncorrectProgramId,

    #[error("Invalid instruction data")]
    InvalidInstructionData,

    #[error("Not enough account keys given to the instruction")]
    NotEnoughAccountKeys,

    #[error("Missing required signature for {0}")]
    MissingRequiredSignature(Pubkey),

    #[error("A mut constraint was violated: {0}")]
    AccountNotMutable(&'static str),

    #[error("A seeds constraint was violated: {0}")]
    ConstraintSeeds(&'static str),

    #[error("Program id mismatch for {0}")]
    InvalidProgramId(&'static str),

    #[error("The program expected this account to be already initialized: {0}")]
    AccountNotInitialized(&'static str),

    #[error("Failed to deserialize the account: {0}")]
    AccountDidNotDeserialize(&'static str),

    #[error("Failed to serialize the account: {0}")]
    AccountDidNotSerialize(&'static str),

    #[error("The given account is owned by a different program: {0}")]
    AccountOwnedByWrongProgram(&'static str),

    #[error("Allocate: account {0} already in use")]
    AccountAlreadyInUse(Pubkey),

    #[error("Invalid context window")]
    InvalidContextWindow,

    #[error("Invalid verifier")]
    InvalidVerifier,

    #[error("Verifier must sign")]
    VerifierMustSign,
}

impl ProgramError {
    /// Anchor custom error code, for the program-defined variants.
    pub fn custom_code(&self) -> Option<u32> {
        match self {
            ProgramError::InvalidContextWindow => Some(6000),
            ProgramError::InvalidVerifier => Some(6001),
            ProgramError::VerifierMustSign => Some(6002),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{derive::ClaimAccounts, instruction};

    const PROGRAM: Pubkey = Pubkey::new_from_array([42; 32]);

    fn key(byte: u8) -> Pubkey {
        Pubkey::new_from_array([byte; 32])
    }

    struct Fixture {
        program: EnforcementProgram,
        accounts: AccountSet,
        config: Pubkey,
        verifier: Pubkey,
    }

    fn initialized() -> Fixture {
        let program = EnforcementProgram::new(PROGRAM);
        let mut accounts = AccountSet::new();
        let admin = key(1);
        let verifier = key(2);
        let (config, _) = ClaimAddressDeriver::new(PROGRAM).config_address(&admin).unwrap();
        let ix = instruction::initialize(&PROGRAM, &admin, &config, &verifier, &key(3), 100, 200);
        program.execute(&mut accounts, &ix).unwrap();
        Fixture {
            program,
            accounts,
            config,
            verifier,
        }
    }

    fn claim_ix(fx: &Fixture, user: Pubkey, mint: Pubkey) -> (Instruction, ClaimAccounts) {
        let cfg = ProtocolConfig::try_from_account_data(&fx.accounts[&fx.config].data).unwrap();
        let accounts = ClaimAddressDeriver::new(PROGRAM)
            .claim_accounts(&fx.config, &cfg, &user, &mint)
            .unwrap();
        let ix = instruction::verify_and_award(
            &PROGRAM,
            &user,
            &fx.verifier,
            &mint,
            &accounts,
            [7; 32],
        );
        (ix, accounts)
    }

    #[test]
    fn initialize_rejects_inverted_window() {
        let program = EnforcementProgram::new(PROGRAM);
        let mut accounts = AccountSet::new();
        let (config, _) = ClaimAddressDeriver::new(PROGRAM).config_address(&key(1)).unwrap();
        let ix = instruction::initialize(&PROGRAM, &key(1), &config, &key(2), &key(3), 200, 200);
        assert_eq!(
            program.execute(&mut accounts, &ix),
            Err(ProgramError::InvalidContextWindow)
        );
        assert_eq!(ProgramError::InvalidContextWindow.custom_code(), Some(6000));
        assert!(accounts.is_empty());
    }

    #[test]
    fn configuration_cannot_be_initialized_twice() {
        let mut fx = initialized();
        let ix = instruction::initialize(&PROGRAM, &key(1), &fx.config, &key(9), &key(3), 1, 2);
        assert_eq!(
            fx.program.execute(&mut fx.accounts, &ix),
            Err(ProgramError::AccountAlreadyInUse(fx.config))
        );
    }

    #[test]
    fn claim_transitions_once() {
        let mut fx = initialized();
        let user = key(10);
        let (ix, derived) = claim_ix(&fx, user, key(11));
        fx.program.execute(&mut fx.accounts, &ix).unwrap();

        let record = ClaimRecord::try_from_account_data(&fx.accounts[&derived.claim].data).unwrap();
        assert_eq!(record.user, user);
        assert!(record.claimed);

        let holding = TokenAccount::unpack(&fx.accounts[&derived.user_token_account].data).unwrap();
        assert_eq!(holding.owner, user);
        assert_eq!(holding.amount, 1);

        let mint = Mint::unpack(&fx.accounts[&key(11)].data).unwrap();
        assert_eq!(mint.mint_authority, COption::Some(derived.mint_authority));
        assert_eq!(mint.supply, 1);
        assert_eq!(mint.decimals, 0);

        // A second claim with a different mint still collides on the claim address.
        let (again, _) = claim_ix(&fx, user, key(12));
        let before = fx.accounts.clone();
        assert_eq!(
            fx.program.execute(&mut fx.accounts, &again),
            Err(ProgramError::AccountAlreadyInUse(derived.claim))
        );
        assert_eq!(fx.accounts, before);
    }

    #[test]
    fn wrong_verifier_is_rejected() {
        let mut fx = initialized();
        let (mut ix, _) = claim_ix(&fx, key(10), key(11));
        ix.accounts[1].pubkey = key(99);
        assert_eq!(
            fx.program.execute(&mut fx.accounts, &ix),
            Err(ProgramError::InvalidVerifier)
        );
    }

    #[test]
    fn verifier_must_sign() {
        let mut fx = initialized();
        let (mut ix, _) = claim_ix(&fx, key(10), key(11));
        ix.accounts[1].is_signer = false;
        assert_eq!(
            fx.program.execute(&mut fx.accounts, &ix),
            Err(ProgramError::VerifierMustSign)
        );
    }

    #[test]
    fn claim_address_for_other_parameters_is_rejected() {
        let mut fx = initialized();
        let (mut ix, _) = claim_ix(&fx, key(10), key(11));
        // Address derived for a different window than the stored configuration.
        let (other, _) = ClaimAddressDeriver::new(PROGRAM)
            .claim_address(&fx.config, &key(10), 0, 1_000, &key(3))
            .unwrap();
        ix.accounts[3].pubkey = other;
        assert_eq!(
            fx.program.execute(&mut fx.accounts, &ix),
            Err(ProgramError::ConstraintSeeds("claim"))
        );
    }

    #[test]
    fn missing_configuration_is_reported() {
        let program = EnforcementProgram::new(PROGRAM);
        let fx = initialized();
        let (ix, _) = claim_ix(&fx, key(10), key(11));
        let mut empty = AccountSet::new();
        assert_eq!(
            program.execute(&mut empty, &ix),
            Err(ProgramError::AccountNotInitialized("config"))
        );
    }

    #[test]
    fn created_accounts_are_rent_exempt() {
        let mut fx = initialized();
        let (ix, derived) = claim_ix(&fx, key(10), key(11));
        fx.program.execute(&mut fx.accounts, &ix).unwrap();

        let holding = &fx.accounts[&derived.user_token_account];
        assert_eq!(holding.data.len(), TokenAccount::LEN);
        assert_eq!(holding.lamports, 2_039_280);
        assert_eq!(
            fx.accounts[&derived.claim].lamports,
            Rent::default().minimum_balance(ClaimRecord::ACCOUNT_LEN)
        );
    }
}
