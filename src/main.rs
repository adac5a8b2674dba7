// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use solana_sdk::signer::Signer;

use absent_verifier::{
    api::router,
    config::{load_keypair, ConfigError, KeypairFileError, VerifierConfig},
    error::ClaimError,
    ledger::{LedgerError, RpcLedgerClient},
    service::VerifierService,
    state::AppState,
    telemetry,
};

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Verifier failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    // Install the ring crypto provider for rustls before any TLS operations.
    // An error only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = VerifierConfig::from_env()?;

    let verifier = load_keypair(&config.verifier_keypair_path)?;
    tracing::info!(verifier = %verifier.pubkey(), "Loaded verifier keypair");

    let ledger = Arc::new(RpcLedgerClient::new(&config.rpc_url, config.rpc_timeout)?);
    tracing::info!(rpc_url = %ledger.rpc_url(), program = %config.program_id, "Connecting to ledger");

    let service = VerifierService::load(
        ledger,
        config.program_id,
        &config.config_admin,
        Arc::new(verifier),
        config.scan.clone(),
    )
    .await?;

    let app = router(AppState::new(service));

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| StartupError::Bind(format!("{}: {e}", config.bind_address())))?;

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    match &config.tls {
        Some(paths) => {
            let tls = RustlsConfig::from_pem_file(&paths.cert, &paths.key)
                .await
                .map_err(|e| StartupError::Tls(e.to_string()))?;
            tracing::info!(%addr, "Absent verifier listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Server)?;
        }
        None => {
            tracing::info!(%addr, "Absent verifier listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Server)?;
        }
    }

    tracing::info!("Absent verifier stopped");
    Ok(())
}

async fn shutdown_on_signal(handle: Handle<SocketAddr>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    }
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Verifier keypair: {0}")]
    Keypair(#[from] KeypairFileError),

    #[error("Ledger client error: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Service(#[from] ClaimError),

    #[error("Invalid bind address {0}")]
    Bind(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("Server error: {0}")]
    Server(std::io::Error),
}
