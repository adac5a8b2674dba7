// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Verifier Service
//!
//! Orchestrates one claim request:
//!
//! ```text
//! RECEIVED -> SCANNING -> ABSENT  -> BUILDING -> Prepared
//!                      -> PRESENT -> Rejected
//!                      -> ERROR   -> ClaimError
//! ```
//!
//! The service holds only read-only state (the configuration loaded at
//! startup and the verifier key) and never writes to the ledger. Uniqueness
//! of claims is enforced by the program, not here: two concurrent requests
//! for one wallet both receive a transaction, and only one can land.

use std::sync::Arc;

use solana_sdk::{
    pubkey::Pubkey,
    signer::{keypair::Keypair, Signer},
};
use tracing::Instrument;
use uuid::Uuid;

use crate::admin::{self, AdminError};
use crate::builder::{ClaimTransactionBuilder, PreparedClaim};
use crate::error::ClaimError;
use crate::ledger::LedgerClient;
use crate::program::{ClaimAddressDeriver, ProtocolConfig, SlotWindow};
use crate::scanner::{HistoryScanner, ScanSettings, Violation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Prepared(PreparedClaim),
    /// The wallet interacted with the forbidden program in the window.
    Rejected(Violation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimStatus {
    pub wallet: Pubkey,
    pub claim_address: Pubkey,
    pub claimed: bool,
}

pub struct VerifierService {
    ledger: Arc<dyn LedgerClient>,
    deriver: ClaimAddressDeriver,
    config_address: Pubkey,
    config: ProtocolConfig,
    window: SlotWindow,
    verifier: Arc<Keypair>,
    scanner: HistoryScanner,
    builder: ClaimTransactionBuilder,
}

impl VerifierService {
    /// Load the configuration for `admin` from the ledger and assemble the service.
    pub async fn load(
        ledger: Arc<dyn LedgerClient>,
        program_id: Pubkey,
        admin: &Pubkey,
        verifier: Arc<Keypair>,
        settings: ScanSettings,
    ) -> Result<Self, ClaimError> {
        let (config_address, config) =
            admin::fetch_configuration(ledger.as_ref(), &program_id, admin)
                .await
                .map_err(|e| match e {
                    AdminError::Ledger(e) => ClaimError::ConfigurationMissing(format!(
                        "could not read configuration for admin {admin}: {e}"
                    )),
                    other => ClaimError::ConfigurationMissing(other.to_string()),
                })?
                .ok_or_else(|| {
                    ClaimError::ConfigurationMissing(format!(
                        "no configuration account for admin {admin}"
                    ))
                })?;

        Self::from_parts(ledger, program_id, config_address, config, verifier, settings)
    }

    /// Assemble the service from an already loaded configuration.
    pub fn from_parts(
        ledger: Arc<dyn LedgerClient>,
        program_id: Pubkey,
        config_address: Pubkey,
        config: ProtocolConfig,
        verifier: Arc<Keypair>,
        settings: ScanSettings,
    ) -> Result<Self, ClaimError> {
        if config.verifier != verifier.pubkey() {
            return Err(ClaimError::VerifierMismatch {
                expected: config.verifier,
                actual: verifier.pubkey(),
            });
        }
        let window = config
            .window()
            .map_err(|e| ClaimError::ConfigurationMissing(e.to_string()))?;

        let deriver = ClaimAddressDeriver::new(program_id);
        let scanner = HistoryScanner::new(Arc::clone(&ledger), settings);
        let builder =
            ClaimTransactionBuilder::new(Arc::clone(&ledger), deriver, Arc::clone(&verifier));

        tracing::info!(
            config = %config_address,
            verifier = %config.verifier,
            forbidden = %config.forbidden_program,
            start_slot = window.start(),
            end_slot = window.end(),
            "Verifier service ready"
        );

        Ok(Self {
            ledger,
            deriver,
            config_address,
            config,
            window,
            verifier,
            scanner,
            builder,
        })
    }

    pub fn verifier_identity(&self) -> Pubkey {
        self.verifier.pubkey()
    }

    pub fn config_address(&self) -> &Pubkey {
        &self.config_address
    }

    pub fn configuration(&self) -> &ProtocolConfig {
        &self.config
    }

    pub async fn handle_claim_request(&self, wallet: &str) -> Result<ClaimOutcome, ClaimError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("claim", %request_id, wallet = wallet.trim());
        self.process_claim(wallet).instrument(span).await
    }

    async fn process_claim(&self, wallet: &str) -> Result<ClaimOutcome, ClaimError> {
        let wallet = parse_wallet(wallet)?;

        let verdict = self
            .scanner
            .scan(&wallet, &self.config.forbidden_program, self.window)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "History scan failed"))?;

        if let Some(violation) = &verdict.violation {
            tracing::info!(
                signature = %violation.signature,
                slot = violation.slot,
                examined = verdict.examined,
                "Claim rejected"
            );
            return Ok(ClaimOutcome::Rejected(violation.clone()));
        }

        let prepared = self
            .builder
            .build(&wallet, &self.config_address, &self.config, &verdict)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Claim transaction build failed"))?;

        tracing::info!(
            claim = %prepared.claim_address,
            mint = %prepared.new_asset,
            examined = verdict.examined,
            "Claim prepared"
        );
        Ok(ClaimOutcome::Prepared(prepared))
    }

    /// Whether `wallet` already holds a claim under this configuration.
    pub async fn claim_status(&self, wallet: &str) -> Result<ClaimStatus, ClaimError> {
        let wallet = parse_wallet(wallet)?;
        let (claim_address, _) = self
            .deriver
            .claim_address(
                &self.config_address,
                &wallet,
                self.config.start_slot,
                self.config.end_slot,
                &self.config.forbidden_program,
            )
            .map_err(|e| ClaimError::InputError(e.to_string()))?;

        let account = self
            .ledger
            .account(&claim_address)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Claim account read failed"))?;

        Ok(ClaimStatus {
            wallet,
            claim_address,
            claimed: account.is_some_and(|a| a.owner == *self.deriver.program_id()),
        })
    }
}

fn parse_wallet(raw: &str) -> Result<Pubkey, ClaimError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ClaimError::InputError("walletAddress is required".to_string()));
    }
    raw.parse()
        .map_err(|_| ClaimError::InputError(format!("Invalid wallet address: {raw}")))
}
