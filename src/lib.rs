// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Absent Verifier - Proof-of-Absence Claims on Solana
//!
//! Off-chain half of the Absent protocol. The verifier reads a wallet's
//! ledger history, decides whether it interacted with a forbidden program
//! during a slot window, and if not, co-signs a claim transaction that the
//! on-chain enforcement program applies at most once per wallet.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `service` - Claim request orchestration
//! - `scanner` - History scanning and absence verdicts
//! - `builder` - Attestation and claim transaction assembly
//! - `program` - Enforcement program accounts, instructions and state machine
//! - `ledger` - Ledger access (JSON-RPC and in-memory)

pub mod admin;
pub mod api;
pub mod builder;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod program;
pub mod scanner;
pub mod service;
pub mod state;
pub mod telemetry;
