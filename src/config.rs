// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. Invalid
//! values are startup errors; nothing is re-read while serving.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RPC_URL` | Solana JSON-RPC endpoint | `https://api.devnet.solana.com` |
//! | `PROGRAM_ID` | Enforcement program id | Required |
//! | `CONFIG_ADMIN` | Admin key the configuration address derives from | Required |
//! | `VERIFIER_KEYPAIR_PATH` | Solana CLI JSON keypair of the verifier | `./verifier.json` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3001` |
//! | `TLS_CERT_PATH` | PEM certificate chain; HTTPS when set with the key | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |
//! | `SCAN_PAGE_SIZE` | Signatures per history page (max 1000) | `1000` |
//! | `SCAN_CONCURRENCY` | Parallel transaction fetches per page | `8` |
//! | `SCAN_TIMEOUT_SECS` | Deadline for one history scan | `30` |
//! | `RPC_TIMEOUT_SECS` | Per-request RPC timeout | `15` |
//! | `FAILED_TX_POLICY` | `count` or `ignore` failed transactions | `count` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use solana_sdk::{
    pubkey::Pubkey,
    signer::keypair::{read_keypair_file, Keypair},
};

use crate::ledger::rpc::DEFAULT_RPC_URL;
use crate::scanner::{FailedTransactionPolicy, ScanSettings, DEFAULT_PAGE_SIZE};

pub const RPC_URL_ENV: &str = "RPC_URL";
pub const PROGRAM_ID_ENV: &str = "PROGRAM_ID";
pub const CONFIG_ADMIN_ENV: &str = "CONFIG_ADMIN";
pub const VERIFIER_KEYPAIR_PATH_ENV: &str = "VERIFIER_KEYPAIR_PATH";

/// Log output format selector (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_VERIFIER_KEYPAIR_PATH: &str = "./verifier.json";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_SCAN_CONCURRENCY: usize = 8;
const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub config_admin: Pubkey,
    pub verifier_keypair_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsPaths>,
    pub rpc_timeout: Duration,
    pub scan: ScanSettings,
}

impl VerifierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let page_size: usize = env.parsed("SCAN_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 || page_size > DEFAULT_PAGE_SIZE {
            return Err(ConfigError::Invalid {
                name: "SCAN_PAGE_SIZE".to_string(),
                reason: format!("must be between 1 and {DEFAULT_PAGE_SIZE}"),
            });
        }
        let concurrency: usize = env.parsed("SCAN_CONCURRENCY", DEFAULT_SCAN_CONCURRENCY)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "SCAN_CONCURRENCY".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let tls = match (env.optional("TLS_CERT_PATH"), env.optional("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "TLS_CERT_PATH".to_string(),
                    reason: "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
                })
            }
        };

        Ok(Self {
            rpc_url: env.or_default(RPC_URL_ENV, DEFAULT_RPC_URL),
            program_id: env.required_parsed(PROGRAM_ID_ENV)?,
            config_admin: env.required_parsed(CONFIG_ADMIN_ENV)?,
            verifier_keypair_path: env
                .or_default(VERIFIER_KEYPAIR_PATH_ENV, DEFAULT_VERIFIER_KEYPAIR_PATH)
                .into(),
            host: env.or_default("HOST", DEFAULT_HOST),
            port: env.parsed("PORT", DEFAULT_PORT)?,
            tls,
            rpc_timeout: Duration::from_secs(env.parsed("RPC_TIMEOUT_SECS", DEFAULT_RPC_TIMEOUT_SECS)?),
            scan: ScanSettings {
                page_size,
                concurrency,
                deadline: Duration::from_secs(
                    env.parsed("SCAN_TIMEOUT_SECS", DEFAULT_SCAN_TIMEOUT_SECS)?,
                ),
                failed_transactions: env
                    .parsed("FAILED_TX_POLICY", FailedTransactionPolicy::default())?,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn required_parsed<T>(&self, name: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self
            .optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))?;
        parse(name, &raw)
    }

    fn parsed<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => parse(name, &raw),
            None => Ok(default),
        }
    }
}

fn parse<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Load a keypair file in the Solana CLI format (JSON array of 64 bytes).
pub fn load_keypair(path: &Path) -> Result<Keypair, KeypairFileError> {
    read_keypair_file(path).map_err(|e| KeypairFileError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot load keypair from {}: {reason}", path.display())]
pub struct KeypairFileError {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(String),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, io::Write};

    use solana_sdk::signer::{
        keypair::{keypair_from_seed, write_keypair_file},
        Signer,
    };

    const PROGRAM: &str = "11111111111111111111111111111111";
    const ADMIN: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";

    fn load(vars: &[(&str, &str)]) -> Result<VerifierConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        VerifierConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = load(&[(PROGRAM_ID_ENV, PROGRAM), (CONFIG_ADMIN_ENV, ADMIN)]).unwrap();

        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.bind_address(), "0.0.0.0:3001");
        assert_eq!(config.verifier_keypair_path, PathBuf::from("./verifier.json"));
        assert_eq!(config.tls, None);
        assert_eq!(config.rpc_timeout, Duration::from_secs(15));
        assert_eq!(config.scan, ScanSettings::default());
        assert_eq!(config.config_admin.to_string(), ADMIN);
    }

    #[test]
    fn missing_program_id_is_reported() {
        assert_eq!(
            load(&[(CONFIG_ADMIN_ENV, ADMIN)]),
            Err(ConfigError::Missing(PROGRAM_ID_ENV.to_string()))
        );
    }

    #[test]
    fn scan_settings_are_read() {
        let config = load(&[
            (PROGRAM_ID_ENV, PROGRAM),
            (CONFIG_ADMIN_ENV, ADMIN),
            ("SCAN_PAGE_SIZE", "250"),
            ("SCAN_CONCURRENCY", "4"),
            ("SCAN_TIMEOUT_SECS", "5"),
            ("FAILED_TX_POLICY", "ignore"),
        ])
        .unwrap();

        assert_eq!(config.scan.page_size, 250);
        assert_eq!(config.scan.concurrency, 4);
        assert_eq!(config.scan.deadline, Duration::from_secs(5));
        assert_eq!(config.scan.failed_transactions, FailedTransactionPolicy::Ignore);
    }

    #[test]
    fn invalid_values_are_errors() {
        let base = [(PROGRAM_ID_ENV, PROGRAM), (CONFIG_ADMIN_ENV, ADMIN)];
        for (name, value) in [
            ("PORT", "http"),
            ("SCAN_PAGE_SIZE", "5000"),
            ("SCAN_CONCURRENCY", "0"),
            ("FAILED_TX_POLICY", "maybe"),
            (CONFIG_ADMIN_ENV, "not-base58!"),
        ] {
            let mut vars = base.to_vec();
            vars.retain(|(k, _)| *k != name);
            vars.push((name, value));
            assert!(
                matches!(load(&vars), Err(ConfigError::Invalid { .. })),
                "{name}={value}"
            );
        }
    }

    #[test]
    fn tls_paths_must_come_in_pairs() {
        let config = load(&[
            (PROGRAM_ID_ENV, PROGRAM),
            (CONFIG_ADMIN_ENV, ADMIN),
            ("TLS_CERT_PATH", "/etc/tls/cert.pem"),
            ("TLS_KEY_PATH", "/etc/tls/key.pem"),
        ])
        .unwrap();
        assert_eq!(
            config.tls,
            Some(TlsPaths {
                cert: "/etc/tls/cert.pem".into(),
                key: "/etc/tls/key.pem".into(),
            })
        );

        assert!(load(&[
            (PROGRAM_ID_ENV, PROGRAM),
            (CONFIG_ADMIN_ENV, ADMIN),
            ("TLS_KEY_PATH", "/etc/tls/key.pem"),
        ])
        .is_err());
    }

    #[test]
    fn keypair_file_loads() {
        let original = keypair_from_seed(&[3; 32]).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        write_keypair_file(&original, file.path()).unwrap();

        let loaded = load_keypair(file.path()).unwrap();
        assert_eq!(loaded.pubkey(), original.pubkey());
    }

    #[test]
    fn unreadable_keypair_files_are_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        let err = load_keypair(file.path()).unwrap_err();
        assert_eq!(err.path, file.path());

        assert!(load_keypair(Path::new("/nonexistent/verifier.json")).is_err());
    }
}
