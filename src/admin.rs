// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Configuration lifecycle: creating the on-chain configuration and reading
//! it back.

use solana_sdk::{
    message::Message,
    pubkey::Pubkey,
    signer::{keypair::Keypair, Signer, SignerError},
    transaction::Transaction,
};

use crate::ledger::{LedgerClient, LedgerError};
use crate::program::{
    instruction, AccountDecodeError, ClaimAddressDeriver, DeriveError, ProtocolConfig, SlotWindow,
};

/// Result of a successful `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedConfiguration {
    pub config_address: Pubkey,
    pub signature: String,
}

/// Build, sign and submit `initialize` for `admin`.
pub async fn initialize_configuration(
    ledger: &dyn LedgerClient,
    program_id: &Pubkey,
    admin: &Keypair,
    verifier: &Pubkey,
    forbidden_program: &Pubkey,
    window: SlotWindow,
) -> Result<InitializedConfiguration, AdminError> {
    let deriver = ClaimAddressDeriver::new(*program_id);
    let (config_address, _) = deriver.config_address(&admin.pubkey())?;

    let ix = instruction::initialize(
        program_id,
        &admin.pubkey(),
        &config_address,
        verifier,
        forbidden_program,
        window.start(),
        window.end(),
    );
    let checkpoint = ledger.latest_checkpoint().await?;
    let message =
        Message::new_with_blockhash(&[ix], Some(&admin.pubkey()), &checkpoint.blockhash);
    let mut tx = Transaction::new_unsigned(message);
    tx.try_sign(&[admin], checkpoint.blockhash)?;

    let signature = ledger.submit_transaction(&tx).await?;
    tracing::info!(
        config = %config_address,
        verifier = %verifier,
        forbidden = %forbidden_program,
        start_slot = window.start(),
        end_slot = window.end(),
        signature = %signature,
        "Configuration initialized"
    );

    Ok(InitializedConfiguration {
        config_address,
        signature,
    })
}

/// Read the configuration derived from `admin`, if it exists.
pub async fn fetch_configuration(
    ledger: &dyn LedgerClient,
    program_id: &Pubkey,
    admin: &Pubkey,
) -> Result<Option<(Pubkey, ProtocolConfig)>, AdminError> {
    let (config_address, _) = ClaimAddressDeriver::new(*program_id).config_address(admin)?;
    let Some(account) = ledger.account(&config_address).await? else {
        return Ok(None);
    };
    if account.owner != *program_id {
        return Err(AdminError::WrongOwner {
            address: config_address,
            owner: account.owner,
        });
    }
    let config = ProtocolConfig::try_from_account_data(&account.data)?;
    Ok(Some((config_address, config)))
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Derive(#[from] DeriveError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Signing(#[from] SignerError),

    #[error("Configuration data is invalid: {0}")]
    Decode(#[from] AccountDecodeError),

    #[error("Account {address} is owned by {owner}, not the program")]
    WrongOwner { address: Pubkey, owner: Pubkey },
}

#[cfg(test)]
mod tests {
    use solana_sdk::signer::keypair::keypair_from_seed;

    use super::*;
    use crate::ledger::{AccountData, MemoryLedger};

    const PROGRAM: Pubkey = Pubkey::new_from_array([42; 32]);

    #[tokio::test]
    async fn initialize_then_fetch() {
        let ledger = MemoryLedger::new(PROGRAM);
        let admin = keypair_from_seed(&[1; 32]).unwrap();
        let verifier = Pubkey::new_from_array([2; 32]);
        let forbidden = Pubkey::new_from_array([3; 32]);
        let window = SlotWindow::new(100, 200).unwrap();

        assert_eq!(
            fetch_configuration(&ledger, &PROGRAM, &admin.pubkey()).await.unwrap(),
            None
        );

        let created =
            initialize_configuration(&ledger, &PROGRAM, &admin, &verifier, &forbidden, window)
                .await
                .unwrap();

        let (address, config) = fetch_configuration(&ledger, &PROGRAM, &admin.pubkey())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(address, created.config_address);
        assert_eq!(config.verifier, verifier);
        assert_eq!(config.forbidden_program, forbidden);
        assert_eq!(config.window().unwrap(), window);
    }

    #[tokio::test]
    async fn second_initialize_is_rejected() {
        let ledger = MemoryLedger::new(PROGRAM);
        let admin = keypair_from_seed(&[1; 32]).unwrap();
        let key = Pubkey::new_from_array([2; 32]);
        let window = SlotWindow::new(1, 2).unwrap();

        initialize_configuration(&ledger, &PROGRAM, &admin, &key, &key, window)
            .await
            .unwrap();
        let err = initialize_configuration(&ledger, &PROGRAM, &admin, &key, &key, window)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Ledger(ref e) if e.is_account_in_use()));
    }

    #[tokio::test]
    async fn foreign_owned_account_is_refused() {
        let ledger = MemoryLedger::new(PROGRAM);
        let admin = Pubkey::new_from_array([1; 32]);
        let (address, _) = ClaimAddressDeriver::new(PROGRAM).config_address(&admin).unwrap();
        ledger.put_account(
            address,
            AccountData {
                owner: Pubkey::new_from_array([9; 32]),
                lamports: 1,
                data: vec![],
            },
        );

        let err = fetch_configuration(&ledger, &PROGRAM, &admin).await.unwrap_err();
        assert!(matches!(err, AdminError::WrongOwner { .. }));
    }
}
