// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::ClaimError,
    models::{ClaimRequest, ClaimResponse, ClaimStatusResponse, INTERACTION_DETECTED},
    service::ClaimOutcome,
    state::AppState,
};

/// Scan the wallet's history and, if it never touched the forbidden program
/// in the window, return a claim transaction for it to sign.
#[utoipa::path(
    post,
    path = "/prepare-claim",
    request_body = ClaimRequest,
    tag = "Claims",
    responses(
        (status = 200, description = "Claim transaction prepared", body = ClaimResponse),
        (status = 400, description = "Invalid wallet address", body = ClaimResponse),
        (status = 403, description = "Forbidden interaction in window", body = ClaimResponse),
        (status = 502, description = "Transaction could not be built", body = ClaimResponse),
        (status = 503, description = "History unavailable", body = ClaimResponse)
    )
)]
pub async fn prepare_claim(
    State(state): State<AppState>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Response, ClaimError> {
    let Json(request) = body.map_err(|e| ClaimError::InputError(e.body_text()))?;
    let wallet = request.wallet_address.unwrap_or_default();

    let response = match state.service.handle_claim_request(&wallet).await? {
        ClaimOutcome::Prepared(prepared) => (
            StatusCode::OK,
            Json(ClaimResponse::Success {
                transaction: prepared.transaction_base64(),
                new_asset_identity: prepared.new_asset.to_string(),
                claim_address: prepared.claim_address.to_string(),
                last_valid_block_height: prepared.last_valid_block_height,
            }),
        ),
        ClaimOutcome::Rejected(_) => (
            StatusCode::FORBIDDEN,
            Json(ClaimResponse::Rejected {
                reason: INTERACTION_DETECTED.to_string(),
            }),
        ),
    };
    Ok(response.into_response())
}

#[utoipa::path(
    get,
    path = "/claim-status/{wallet}",
    params(
        ("wallet" = String, Path, description = "Base58 wallet address")
    ),
    tag = "Claims",
    responses(
        (status = 200, body = ClaimStatusResponse),
        (status = 400, description = "Invalid wallet address", body = ClaimResponse)
    )
)]
pub async fn claim_status(
    Path(wallet): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClaimStatusResponse>, ClaimError> {
    let status = state.service.claim_status(&wallet).await?;
    Ok(Json(ClaimStatusResponse {
        wallet: status.wallet.to_string(),
        claim_address: status.claim_address.to_string(),
        claimed: status.claimed,
    }))
}
