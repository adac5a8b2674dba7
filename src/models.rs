// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the verifier API. All types derive
//! `ToSchema` for the OpenAPI document. Field names are camelCase on the
//! wire.
//!
//! Claim responses are a tagged union on `status`:
//!
//! | `status` | HTTP | Fields |
//! |----------|------|--------|
//! | `success` | 200 | `transaction`, `newAssetIdentity`, `claimAddress`, `lastValidBlockHeight` |
//! | `rejected` | 403 | `reason` |
//! | `failed` | 4xx/5xx | `reason`, `errorCode`, `retriable` |

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reason carried by a rejected claim.
pub const INTERACTION_DETECTED: &str = "interaction-detected";

// =============================================================================
// Claim Models
// =============================================================================

/// Body of `POST /prepare-claim`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Base58 wallet address. `userPubkey` is accepted as an alias.
    #[serde(default, alias = "userPubkey")]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ClaimResponse {
    /// A partially signed claim transaction for the wallet to sign and submit.
    Success {
        /// Base64 legacy transaction; the fee-payer signature slot is empty.
        transaction: String,
        /// Mint address of the credential this transaction creates.
        #[serde(rename = "newAssetIdentity")]
        new_asset_identity: String,
        #[serde(rename = "claimAddress")]
        claim_address: String,
        /// The transaction expires after this block height.
        #[serde(rename = "lastValidBlockHeight")]
        last_valid_block_height: u64,
    },
    /// The wallet interacted with the forbidden program in the window.
    Rejected { reason: String },
    Failed {
        reason: String,
        #[serde(rename = "errorCode")]
        error_code: String,
        retriable: bool,
    },
}

/// Response of `GET /claim-status/{wallet}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatusResponse {
    pub wallet: String,
    pub claim_address: String,
    /// The claim record exists on the ledger.
    pub claimed: bool,
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub verifier_identity: String,
    pub config_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_accepts_either_field_name() {
        let primary: ClaimRequest = serde_json::from_value(json!({ "walletAddress": "abc" })).unwrap();
        let alias: ClaimRequest = serde_json::from_value(json!({ "userPubkey": "abc" })).unwrap();
        let empty: ClaimRequest = serde_json::from_value(json!({})).unwrap();

        assert_eq!(primary.wallet_address.as_deref(), Some("abc"));
        assert_eq!(alias, primary);
        assert_eq!(empty.wallet_address, None);
    }

    #[test]
    fn responses_are_tagged_by_status() {
        let success = ClaimResponse::Success {
            transaction: "AQ==".into(),
            new_asset_identity: "mint".into(),
            claim_address: "claim".into(),
            last_valid_block_height: 42,
        };
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            json!({
                "status": "success",
                "transaction": "AQ==",
                "newAssetIdentity": "mint",
                "claimAddress": "claim",
                "lastValidBlockHeight": 42
            })
        );

        let rejected = ClaimResponse::Rejected {
            reason: INTERACTION_DETECTED.into(),
        };
        assert_eq!(
            serde_json::to_value(&rejected).unwrap(),
            json!({ "status": "rejected", "reason": "interaction-detected" })
        );
    }
}
