// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Attestation and claim transaction assembly.
//!
//! The builder turns a passing verdict into a `verify_and_award` transaction
//! that carries the verifier's and the new mint's signatures. The wallet's
//! signature slot (fee payer, index 0) is left empty, so the transaction is
//! inert until the wallet signs and submits it. The builder never submits.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use solana_sdk::{
    hash::Hash,
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    signer::{keypair::Keypair, Signer, SignerError},
    transaction::Transaction,
};

use crate::ledger::{LedgerClient, LedgerError};
use crate::program::{instruction, ClaimAddressDeriver, DeriveError, ProtocolConfig};
use crate::scanner::Verdict;

/// Domain separator of the proof hash.
const ATTESTATION_DOMAIN: &[u8] = b"absent:attestation:v1";

/// Hash binding an attestation to its configuration, wallet and scan.
pub fn proof_hash(
    config_address: &Pubkey,
    wallet: &Pubkey,
    config: &ProtocolConfig,
    examined: u64,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(ATTESTATION_DOMAIN);
    hasher.update(config_address);
    hasher.update(wallet);
    hasher.update(config.forbidden_program);
    hasher.update(config.start_slot.to_le_bytes());
    hasher.update(config.end_slot.to_le_bytes());
    hasher.update(examined.to_le_bytes());
    hasher.finalize().into()
}

/// A partially signed claim ready to hand to the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedClaim {
    /// Legacy wire-format transaction with an empty fee-payer signature.
    pub transaction: Vec<u8>,
    pub new_asset: Pubkey,
    pub claim_address: Pubkey,
    pub proof_hash: [u8; 32],
    pub last_valid_block_height: u64,
}

impl PreparedClaim {
    pub fn transaction_base64(&self) -> String {
        BASE64.encode(&self.transaction)
    }
}

pub struct ClaimTransactionBuilder {
    ledger: Arc<dyn LedgerClient>,
    deriver: ClaimAddressDeriver,
    verifier: Arc<Keypair>,
}

impl ClaimTransactionBuilder {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        deriver: ClaimAddressDeriver,
        verifier: Arc<Keypair>,
    ) -> Self {
        Self {
            ledger,
            deriver,
            verifier,
        }
    }

    pub async fn build(
        &self,
        wallet: &Pubkey,
        config_address: &Pubkey,
        config: &ProtocolConfig,
        verdict: &Verdict,
    ) -> Result<PreparedClaim, BuildError> {
        if !verdict.absent {
            return Err(BuildError::NotAbsent);
        }

        let mint = Keypair::new();
        let new_asset = mint.pubkey();
        let accounts = self
            .deriver
            .claim_accounts(config_address, config, wallet, &new_asset)?;
        let proof_hash = proof_hash(config_address, wallet, config, verdict.examined);

        let ix = instruction::verify_and_award(
            self.deriver.program_id(),
            wallet,
            &self.verifier.pubkey(),
            &new_asset,
            &accounts,
            proof_hash,
        );

        let checkpoint = self.ledger.latest_checkpoint().await?;
        let message = Message::new_with_blockhash(&[ix], Some(wallet), &checkpoint.blockhash);
        let mut tx = Transaction::new_unsigned(message);
        sign_with_ephemeral_mint(&mut tx, &self.verifier, mint, checkpoint.blockhash)?;

        tracing::debug!(
            wallet = %wallet,
            claim = %accounts.claim,
            mint = %new_asset,
            missing = ?missing_signers(&tx),
            "Prepared claim transaction"
        );

        Ok(PreparedClaim {
            transaction: bincode::serialize(&tx)?,
            new_asset,
            claim_address: accounts.claim,
            proof_hash,
            last_valid_block_height: checkpoint.last_valid_block_height,
        })
    }
}

/// Adds the verifier's and the mint's signatures. The mint key is consumed:
/// once it has signed, nothing can sign for that address again.
fn sign_with_ephemeral_mint(
    tx: &mut Transaction,
    verifier: &Keypair,
    mint: Keypair,
    blockhash: Hash,
) -> Result<(), SignerError> {
    tx.try_partial_sign(&[verifier, &mint], blockhash)
}

/// Signer keys whose signature slot is still empty.
pub fn missing_signers(tx: &Transaction) -> Vec<Pubkey> {
    tx.message
        .signer_keys()
        .into_iter()
        .zip(&tx.signatures)
        .filter(|(_, signature)| **signature == Signature::default())
        .map(|(key, _)| *key)
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Cannot attest a wallet whose verdict is not absent")]
    NotAbsent,

    #[error("Address derivation failed: {0}")]
    Derive(#[from] DeriveError),

    #[error("Blockhash fetch failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Transaction signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Transaction encoding failed: {0}")]
    Encode(#[from] bincode::Error),
}

#[cfg(test)]
mod tests {
    use solana_sdk::signer::keypair::keypair_from_seed;

    use super::*;
    use crate::ledger::MemoryLedger;

    const PROGRAM: Pubkey = Pubkey::new_from_array([42; 32]);

    fn config(verifier: &Keypair) -> ProtocolConfig {
        ProtocolConfig {
            admin: Pubkey::new_from_array([1; 32]),
            verifier: verifier.pubkey(),
            forbidden_program: Pubkey::new_from_array([3; 32]),
            start_slot: 100,
            end_slot: 200,
            bump: 255,
        }
    }

    fn absent() -> Verdict {
        Verdict {
            absent: true,
            examined: 4,
            violation: None,
        }
    }

    fn builder(ledger: Arc<MemoryLedger>, verifier: &Arc<Keypair>) -> ClaimTransactionBuilder {
        ClaimTransactionBuilder::new(ledger, ClaimAddressDeriver::new(PROGRAM), verifier.clone())
    }

    #[tokio::test]
    async fn leaves_only_the_wallet_slot_empty() {
        let ledger = Arc::new(MemoryLedger::new(PROGRAM));
        let verifier = Arc::new(keypair_from_seed(&[5; 32]).unwrap());
        let wallet = keypair_from_seed(&[6; 32]).unwrap().pubkey();
        let cfg = config(&verifier);
        let config_address = Pubkey::new_from_array([9; 32]);

        let prepared = builder(ledger, &verifier)
            .build(&wallet, &config_address, &cfg, &absent())
            .await
            .unwrap();

        let tx: Transaction = bincode::deserialize(&prepared.transaction).unwrap();
        assert_eq!(tx.message.account_keys[0], wallet);
        assert_eq!(missing_signers(&tx), vec![wallet]);
        assert_eq!(tx.signatures.len(), 3);
        assert_eq!(tx.verify_with_results(), vec![false, true, true]);

        let ix = &tx.message.instructions[0];
        let key = |position: usize| tx.message.account_keys[usize::from(ix.accounts[position])];
        assert_eq!(tx.message.account_keys[usize::from(ix.program_id_index)], PROGRAM);
        assert_eq!(key(3), prepared.claim_address);
        assert_eq!(key(5), prepared.new_asset);
        assert_eq!(key(7), spl_token::id());
        assert_eq!(key(8), spl_associated_token_account_client::program::id());
        assert_eq!(&ix.data[8..], &prepared.proof_hash);
    }

    #[tokio::test]
    async fn every_build_mints_a_fresh_asset() {
        let ledger = Arc::new(MemoryLedger::new(PROGRAM));
        let verifier = Arc::new(keypair_from_seed(&[5; 32]).unwrap());
        let wallet = Pubkey::new_from_array([6; 32]);
        let cfg = config(&verifier);
        let config_address = Pubkey::new_from_array([9; 32]);
        let builder = builder(ledger, &verifier);

        let a = builder.build(&wallet, &config_address, &cfg, &absent()).await.unwrap();
        let b = builder.build(&wallet, &config_address, &cfg, &absent()).await.unwrap();
        assert_ne!(a.new_asset, b.new_asset);
        assert_eq!(a.claim_address, b.claim_address);
        assert!(!a.transaction_base64().is_empty());
    }

    #[tokio::test]
    async fn refuses_a_present_verdict() {
        let ledger = Arc::new(MemoryLedger::new(PROGRAM));
        let verifier = Arc::new(keypair_from_seed(&[5; 32]).unwrap());
        let verdict = Verdict {
            absent: false,
            examined: 1,
            violation: None,
        };
        let err = builder(ledger, &verifier)
            .build(
                &Pubkey::new_from_array([6; 32]),
                &Pubkey::new_from_array([9; 32]),
                &config(&verifier),
                &verdict,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::NotAbsent));
    }

    #[test]
    fn proof_hash_binds_every_input() {
        let verifier = keypair_from_seed(&[5; 32]).unwrap();
        let cfg = config(&verifier);
        let config_address = Pubkey::new_from_array([9; 32]);
        let wallet = Pubkey::new_from_array([6; 32]);
        let base = proof_hash(&config_address, &wallet, &cfg, 4);

        assert_eq!(base, proof_hash(&config_address, &wallet, &cfg, 4));
        assert_ne!(base, proof_hash(&config_address, &wallet, &cfg, 5));
        assert_ne!(base, proof_hash(&wallet, &config_address, &cfg, 4));

        let mut shifted = cfg.clone();
        shifted.end_slot = 201;
        assert_ne!(base, proof_hash(&config_address, &wallet, &shifted, 4));
    }
}
