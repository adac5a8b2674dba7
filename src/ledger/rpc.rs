// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana JSON-RPC client for ledger interactions.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use solana_rpc_client::{
    nonblocking::rpc_client::RpcClient, rpc_client::GetConfirmedSignaturesForAddress2Config,
};
use solana_rpc_client_api::{
    client_error::{Error as ClientError, ErrorKind as ClientErrorKind},
    config::RpcTransactionConfig,
    request::{RpcError, RpcRequest, RpcResponseErrorData},
};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status_client_types::{
    option_serializer::OptionSerializer, EncodedConfirmedTransactionWithStatusMeta,
    EncodedTransaction, UiInstruction, UiMessage, UiParsedInstruction, UiTransactionEncoding,
};

use super::{AccountData, Checkpoint, LedgerClient, LedgerError, ParsedTransaction, SignatureInfo};

/// Devnet endpoint used when no `RPC_URL` is configured.
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// JSON-RPC-backed [`LedgerClient`].
///
/// Every read and the send preflight run at `confirmed` commitment.
pub struct RpcLedgerClient {
    rpc_url: url::Url,
    rpc: RpcClient,
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient")
            .field("rpc_url", &self.rpc_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RpcLedgerClient {
    /// Create a client for `rpc_url` with a per-request timeout.
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let rpc_url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;

        let rpc = RpcClient::new_with_timeout_and_commitment(
            rpc_url.to_string(),
            timeout,
            CommitmentConfig::confirmed(),
        );

        Ok(Self { rpc_url, rpc })
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url.as_str()
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, LedgerError> {
        let before = before.map(parse_signature).transpose()?;
        let config = GetConfirmedSignaturesForAddress2Config {
            before,
            until: None,
            limit: Some(limit),
            commitment: Some(self.rpc.commitment()),
        };

        let entries = self
            .rpc
            .get_signatures_for_address_with_config(address, config)
            .await
            .map_err(map_client_error)?;

        Ok(entries
            .into_iter()
            .map(|entry| SignatureInfo {
                signature: entry.signature,
                slot: entry.slot,
                failed: entry.err.is_some(),
            })
            .collect())
    }

    async fn parsed_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ParsedTransaction>, LedgerError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.rpc.commitment()),
            max_supported_transaction_version: Some(0),
        };

        // `getTransaction` answers `null` for unknown signatures; the typed
        // helper turns that into an error, so go through `send` directly.
        let tx: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .rpc
            .send(
                RpcRequest::GetTransaction,
                json!([parse_signature(signature)?.to_string(), config]),
            )
            .await
            .map_err(map_client_error)?;

        tx.map(|tx| flatten_transaction(signature, tx)).transpose()
    }

    async fn latest_checkpoint(&self) -> Result<Checkpoint, LedgerError> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(self.rpc.commitment())
            .await
            .map_err(map_client_error)?;

        Ok(Checkpoint {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<AccountData>, LedgerError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .await
            .map_err(map_client_error)?;

        Ok(response.value.map(AccountData::from))
    }

    async fn submit_transaction(&self, tx: &Transaction) -> Result<String, LedgerError> {
        let signature = self
            .rpc
            .send_transaction(tx)
            .await
            .map_err(map_client_error)?;

        Ok(signature.to_string())
    }

    async fn first_available_slot(&self) -> Result<u64, LedgerError> {
        self.rpc
            .get_first_available_block()
            .await
            .map_err(map_client_error)
    }
}

fn parse_signature(signature: &str) -> Result<Signature, LedgerError> {
    signature.parse().map_err(|_| LedgerError::Rpc {
        code: -32602,
        message: format!("Invalid param: not a signature {signature}"),
    })
}

fn map_client_error(err: ClientError) -> LedgerError {
    match err.kind() {
        ClientErrorKind::Reqwest(e) if e.is_timeout() => LedgerError::Timeout,
        ClientErrorKind::Reqwest(e) => LedgerError::Transport(e.to_string()),
        ClientErrorKind::SerdeJson(e) => LedgerError::InvalidResponse(e.to_string()),
        ClientErrorKind::TransactionError(e) => LedgerError::Rejected(e.to_string()),
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            code,
            message,
            data,
        }) => match data {
            // The useful detail (e.g. "already in use") is in the simulation logs.
            RpcResponseErrorData::SendTransactionPreflightFailure(simulation) => {
                rejection_with_logs(message, simulation.logs.as_deref().unwrap_or_default())
            }
            _ => LedgerError::Rpc {
                code: *code,
                message: message.clone(),
            },
        },
        _ => LedgerError::Transport(err.to_string()),
    }
}

fn rejection_with_logs(message: &str, logs: &[String]) -> LedgerError {
    if logs.is_empty() {
        LedgerError::Rejected(message.to_string())
    } else {
        LedgerError::Rejected(format!("{message}\n{}", logs.join("\n")))
    }
}

/// Flatten a `jsonParsed` transaction into the scanner's view.
///
/// Missing metadata or inner-instruction records make the transaction
/// uninspectable, which is an error rather than evidence of absence.
fn flatten_transaction(
    signature: &str,
    tx: EncodedConfirmedTransactionWithStatusMeta,
) -> Result<ParsedTransaction, LedgerError> {
    let invalid = |what: &str| {
        LedgerError::InvalidResponse(format!("transaction {signature} {what}"))
    };

    let meta = tx
        .transaction
        .meta
        .ok_or_else(|| invalid("has no metadata"))?;
    let inner = match meta.inner_instructions {
        OptionSerializer::Some(inner) => inner,
        _ => return Err(invalid("has no inner instruction record")),
    };

    let EncodedTransaction::Json(ui) = tx.transaction.transaction else {
        return Err(invalid("is not JSON encoded"));
    };
    let (account_keys, top_level): (Vec<String>, Vec<UiInstruction>) = match ui.message {
        UiMessage::Parsed(message) => (
            message.account_keys.into_iter().map(|key| key.pubkey).collect(),
            message.instructions,
        ),
        UiMessage::Raw(message) => (
            message.account_keys,
            message
                .instructions
                .into_iter()
                .map(UiInstruction::Compiled)
                .collect(),
        ),
    };

    let mut invoked_programs = Vec::new();
    for ix in top_level
        .iter()
        .chain(inner.iter().flat_map(|set| set.instructions.iter()))
    {
        let program_id = instruction_program_id(ix, &account_keys)
            .ok_or_else(|| invalid("has an instruction without a program id"))?;
        let program_id: Pubkey = program_id
            .parse()
            .map_err(|e| LedgerError::InvalidResponse(format!("{signature}: {e}")))?;
        invoked_programs.push(program_id);
    }

    Ok(ParsedTransaction {
        signature: signature.to_string(),
        slot: tx.slot,
        failed: meta.err.is_some(),
        invoked_programs,
    })
}

fn instruction_program_id<'a>(
    ix: &'a UiInstruction,
    account_keys: &'a [String],
) -> Option<&'a str> {
    match ix {
        UiInstruction::Compiled(compiled) => account_keys
            .get(usize::from(compiled.program_id_index))
            .map(String::as_str),
        UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => Some(&parsed.program_id),
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(decoded)) => {
            Some(&decoded.program_id)
        }
    }
}
