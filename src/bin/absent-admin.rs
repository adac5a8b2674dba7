// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrative client for the Absent enforcement program.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;

use absent_verifier::{
    admin::{self, AdminError},
    config::{load_keypair, KeypairFileError},
    ledger::{rpc::DEFAULT_RPC_URL, LedgerError, RpcLedgerClient},
    program::{AccountDecodeError, SlotWindow},
    telemetry,
};

#[derive(Debug, Parser)]
#[command(name = "absent-admin")]
#[command(version, about = "Create and inspect Absent configurations", long_about = None)]
struct Cli {
    /// Solana JSON-RPC endpoint
    #[arg(long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Enforcement program id
    #[arg(long, env = "PROGRAM_ID")]
    program_id: Pubkey,

    /// Per-request RPC timeout in seconds
    #[arg(long, env = "RPC_TIMEOUT_SECS", default_value_t = 15)]
    rpc_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the configuration for an admin key.
    Init {
        /// Admin keypair file (Solana CLI JSON format); pays and signs
        #[arg(long)]
        admin_keypair: PathBuf,

        /// Verifier public key that must co-sign every claim
        #[arg(long)]
        verifier: Pubkey,

        /// Program whose use disqualifies a wallet
        #[arg(long)]
        forbidden: Pubkey,

        /// First slot of the window (inclusive)
        #[arg(long)]
        start: u64,

        /// Last slot of the window (inclusive)
        #[arg(long)]
        end: u64,
    },

    /// Print the configuration derived from an admin key.
    Show {
        #[arg(long, env = "CONFIG_ADMIN")]
        admin: Pubkey,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let ledger = RpcLedgerClient::new(&cli.rpc_url, Duration::from_secs(cli.rpc_timeout_secs))?;

    match cli.command {
        Command::Init {
            admin_keypair,
            verifier,
            forbidden,
            start,
            end,
        } => {
            let window = SlotWindow::new(start, end)?;
            let admin = load_keypair(&admin_keypair)?;
            let created = admin::initialize_configuration(
                &ledger,
                &cli.program_id,
                &admin,
                &verifier,
                &forbidden,
                window,
            )
            .await?;
            println!(
                "{}",
                json!({
                    "configAddress": created.config_address.to_string(),
                    "signature": created.signature,
                })
            );
        }
        Command::Show { admin } => {
            match admin::fetch_configuration(&ledger, &cli.program_id, &admin).await? {
                Some((address, config)) => println!(
                    "{}",
                    json!({
                        "configAddress": address.to_string(),
                        "admin": config.admin.to_string(),
                        "verifier": config.verifier.to_string(),
                        "forbiddenProgram": config.forbidden_program.to_string(),
                        "startSlot": config.start_slot,
                        "endSlot": config.end_slot,
                        "bump": config.bump,
                    })
                ),
                None => return Err(CliError::NotFound(admin)),
            }
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Keypair(#[from] KeypairFileError),

    #[error(transparent)]
    Window(#[from] AccountDecodeError),

    #[error("No configuration exists for admin {0}")]
    NotFound(Pubkey),
}
