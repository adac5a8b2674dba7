// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claim request errors.
//!
//! Every failure of the claim flow maps to one [`ClaimError`] variant with a
//! stable error code, an HTTP status and a retry hint. Ledger and scan
//! details are kept as the error source for logging; response bodies only
//! carry the variant's own message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use solana_sdk::pubkey::Pubkey;

use crate::builder::BuildError;
use crate::ledger::LedgerError;
use crate::models::ClaimResponse;
use crate::scanner::ScanError;

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// Malformed or missing wallet address. No ledger call was made.
    #[error("{0}")]
    InputError(String),

    /// History could not be fully examined.
    #[error("Transaction history is temporarily unavailable")]
    ScanUnavailable(#[source] ScanError),

    /// A direct ledger read outside the scan failed.
    #[error("Ledger is temporarily unavailable")]
    LedgerUnavailable(#[source] LedgerError),

    /// The on-chain configuration is absent or undecodable.
    #[error("Configuration unavailable: {0}")]
    ConfigurationMissing(String),

    /// The loaded signing key is not the configuration's verifier.
    #[error("Verifier key {actual} does not match configured verifier {expected}")]
    VerifierMismatch { expected: Pubkey, actual: Pubkey },

    /// The claim transaction could not be assembled.
    #[error("Claim transaction could not be built")]
    TransactionBuildFailure(#[source] BuildError),
}

impl ClaimError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ClaimError::InputError(_) => "input_error",
            ClaimError::ScanUnavailable(_) => "scan_unavailable",
            ClaimError::LedgerUnavailable(_) => "ledger_unavailable",
            ClaimError::ConfigurationMissing(_) => "configuration_missing",
            ClaimError::VerifierMismatch { .. } => "verifier_mismatch",
            ClaimError::TransactionBuildFailure(_) => "transaction_build_failure",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ClaimError::InputError(_) => StatusCode::BAD_REQUEST,
            ClaimError::ScanUnavailable(_) | ClaimError::LedgerUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ClaimError::ConfigurationMissing(_) | ClaimError::VerifierMismatch { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ClaimError::TransactionBuildFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether the same request may succeed later.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ClaimError::ScanUnavailable(_)
                | ClaimError::LedgerUnavailable(_)
                | ClaimError::TransactionBuildFailure(_)
        )
    }
}

impl From<ScanError> for ClaimError {
    fn from(err: ScanError) -> Self {
        ClaimError::ScanUnavailable(err)
    }
}

impl From<LedgerError> for ClaimError {
    fn from(err: LedgerError) -> Self {
        ClaimError::LedgerUnavailable(err)
    }
}

impl From<BuildError> for ClaimError {
    fn from(err: BuildError) -> Self {
        ClaimError::TransactionBuildFailure(err)
    }
}

impl IntoResponse for ClaimError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ClaimResponse::Failed {
            reason: self.to_string(),
            error_code: self.error_code().to_string(),
            retriable: self.is_retriable(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn input_error_returns_400_and_is_final() {
        let response = ClaimError::InputError("walletAddress is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["status"], "failed");
        assert_eq!(body["errorCode"], "input_error");
        assert_eq!(body["reason"], "walletAddress is required");
        assert_eq!(body["retriable"], false);
    }

    #[tokio::test]
    async fn scan_unavailable_hides_transport_details() {
        let err = ClaimError::from(ScanError::Ledger(LedgerError::Transport(
            "tcp connect to 10.0.0.3:8899 refused".into(),
        )));
        assert!(err.is_retriable());

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert!(body.contains("scan_unavailable"));
        assert!(!body.contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn ledger_unavailable_is_a_retriable_503() {
        let err = ClaimError::from(LedgerError::Timeout);
        assert_eq!(err.error_code(), "ledger_unavailable");
        assert!(err.is_retriable());

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["errorCode"], "ledger_unavailable");
        assert_eq!(body["retriable"], true);
    }

    #[test]
    fn build_failure_is_a_retriable_502() {
        let err = ClaimError::from(BuildError::Ledger(LedgerError::Timeout));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "transaction_build_failure");
        assert!(err.is_retriable());
    }

    #[test]
    fn configuration_errors_are_fatal() {
        let err = ClaimError::ConfigurationMissing("no account".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_retriable());

        let mismatch = ClaimError::VerifierMismatch {
            expected: Pubkey::new_from_array([1; 32]),
            actual: Pubkey::new_from_array([2; 32]),
        };
        assert_eq!(mismatch.error_code(), "verifier_mismatch");
        assert!(!mismatch.is_retriable());
    }
}
