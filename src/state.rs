// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::service::VerifierService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VerifierService>,
}

impl AppState {
    pub fn new(service: VerifierService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
