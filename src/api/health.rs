// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{models::HealthResponse, state::AppState};

/// Liveness check. Reports the verifier identity transactions are co-signed with.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        verifier_identity: state.service.verifier_identity().to_string(),
        config_address: state.service.config_address().to_string(),
    })
}
