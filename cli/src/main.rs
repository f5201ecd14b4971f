//! attest: operator CLI for the tamper-evident audit ledger.
//!
//! Appends to and verifies the JSONL stores under the configured data
//! directory, or runs the built-in in-memory demo.
//!
//! Usage:
//!   attest --config attest.toml append --tenant t1 --action create --diff '{"amount":100}'
//!   attest --config attest.toml append-block --data-type security_event --data '{"user":"u1"}'
//!   attest --config attest.toml query --data-type security_event --start 2024-01-01T00:00:00Z
//!   attest --config attest.toml verify-chain --tenant t1
//!   attest --config attest.toml sweep
//!   attest demo
//!
//! Exit status is 1 on error and 2 when verification finds tampering.

mod commands;
mod demo;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use attest_config::AttestConfig;
use attest_contracts::{
    block::{BlockQuery, DataType},
    entry::NewAuditEntry,
    error::{AttestError, AttestResult},
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// attest: hash-chained audit log and proof-of-work ledger.
#[derive(Parser)]
#[command(
    name = "attest",
    about = "Tamper-evident audit log and proof-of-work ledger",
    long_about = "Appends hash-chained audit entries and proof-of-work sealed blocks,\n\
                  and verifies both chains from genesis to tip."
)]
struct Cli {
    /// Path to the TOML configuration.  Required by every command but `demo`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `storage.data_dir` from the configuration.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append an entry to a tenant's audit chain.
    Append {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        action: String,
        #[arg(long)]
        actor: Option<String>,
        #[arg(long)]
        entity: Option<String>,
        #[arg(long)]
        entity_id: Option<String>,
        /// JSON description of the change.
        #[arg(long, value_parser = parse_json)]
        diff: Option<Value>,
    },
    /// Mine and append a ledger block.
    AppendBlock {
        /// One of audit_log, security_event, permission_change.
        #[arg(long)]
        data_type: DataType,
        /// JSON payload.
        #[arg(long, value_parser = parse_json)]
        data: Value,
    },
    /// List a tenant's most recent audit entries, newest first.
    Recent {
        #[arg(long)]
        tenant: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// List ledger blocks, newest first.
    Query {
        #[arg(long)]
        data_type: Option<DataType>,
        /// Earliest block timestamp to include, RFC 3339 (inclusive).
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Latest block timestamp to include, RFC 3339 (inclusive).
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Verify one tenant's audit chain.
    VerifyChain {
        #[arg(long)]
        tenant: String,
    },
    /// Verify the proof-of-work ledger.
    VerifyLedger,
    /// Verify every tenant chain and the ledger.
    Sweep,
    /// Run the audit and ledger scenarios against in-memory stores.
    Demo,
}

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {}", e))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Dispatch a command.  `Ok(false)` means verification found tampering.
async fn run(cli: Cli) -> AttestResult<bool> {
    let config = match &cli.config {
        Some(path) => Some(AttestConfig::from_file(path)?),
        None => None,
    };

    if let Command::Demo = cli.command {
        return demo::run(config.as_ref()).await;
    }

    let mut config = config.ok_or_else(|| AttestError::ConfigError {
        reason: "no configuration given; pass --config <path>".to_string(),
    })?;
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    debug!(data_dir = %config.storage.data_dir.display(), "using data directory");

    match cli.command {
        Command::Append {
            tenant,
            action,
            actor,
            entity,
            entity_id,
            diff,
        } => {
            let mut entry = NewAuditEntry::new(tenant, action);
            entry.actor_id = actor;
            entry.entity = entity;
            entry.entity_id = entity_id;
            if let Some(diff) = diff {
                entry.diff = diff;
            }
            commands::append(&config, entry)
        }
        Command::AppendBlock { data_type, data } => {
            commands::append_block(&config, data, data_type).await
        }
        Command::Recent { tenant, limit } => commands::recent(&config, &tenant, limit),
        Command::Query {
            data_type,
            start,
            end,
            limit,
        } => commands::query(
            &config,
            &BlockQuery {
                data_type,
                start,
                end,
                limit,
            },
        ),
        Command::VerifyChain { tenant } => commands::verify_chain(&config, &tenant),
        Command::VerifyLedger => commands::verify_ledger(&config),
        Command::Sweep => commands::sweep(&config),
        Command::Demo => demo::run(Some(&config)).await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use clap::Parser;

    use attest_contracts::block::DataType;

    use super::{Cli, Command};

    /// `query` takes an RFC 3339 time window alongside the tag filter.
    #[test]
    fn test_query_parses_time_window() {
        let cli = Cli::try_parse_from([
            "attest",
            "query",
            "--data-type",
            "security_event",
            "--start",
            "2024-01-01T00:00:00Z",
            "--end",
            "2024-01-02T12:30:00+02:00",
            "--limit",
            "5",
        ])
        .unwrap();

        match cli.command {
            Command::Query {
                data_type,
                start,
                end,
                limit,
            } => {
                assert_eq!(data_type, Some(DataType::SecurityEvent));
                assert_eq!(start, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
                assert_eq!(end, Some(Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap()));
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected the query command"),
        }
    }

    #[test]
    fn test_query_window_is_optional() {
        let cli = Cli::try_parse_from(["attest", "query"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Query {
                start: None,
                end: None,
                ..
            }
        ));
    }

    #[test]
    fn test_query_rejects_malformed_timestamp() {
        assert!(Cli::try_parse_from(["attest", "query", "--start", "yesterday"]).is_err());
    }
}
