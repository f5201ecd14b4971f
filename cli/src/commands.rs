//! Store-backed commands.
//!
//! Every command opens the JSONL stores under `storage.data_dir`, does one
//! thing, and prints its result as JSON on stdout.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use attest_audit::{JsonlAuditStore, SequentialAuditLog};
use attest_config::AttestConfig;
use attest_contracts::{
    block::{BlockQuery, DataType},
    entry::NewAuditEntry,
    error::{AttestError, AttestResult},
    report::IntegrityReport,
};
use attest_core::traits::{AuditStore, LedgerStore};
use attest_ledger::{JsonlLedgerStore, ProofOfWorkLedger};
use attest_verify::IntegrityVerifier;

fn audit_store(config: &AttestConfig) -> AttestResult<Arc<JsonlAuditStore>> {
    Ok(Arc::new(JsonlAuditStore::open(config.storage.audit_path())?))
}

fn ledger_store(config: &AttestConfig) -> AttestResult<Arc<JsonlLedgerStore>> {
    Ok(Arc::new(JsonlLedgerStore::open(config.storage.ledger_path())?))
}

fn verifier(config: &AttestConfig) -> AttestResult<IntegrityVerifier> {
    Ok(IntegrityVerifier::new(audit_store(config)?, ledger_store(config)?))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> AttestResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| AttestError::Serialization {
        reason: e.to_string(),
    })?;
    println!("{}", text);
    Ok(())
}

fn print_report(report: &IntegrityReport) -> AttestResult<bool> {
    print_json(report)?;
    Ok(report.ok)
}

pub fn append(config: &AttestConfig, entry: NewAuditEntry) -> AttestResult<bool> {
    let log = SequentialAuditLog::new(audit_store(config)?, config.append_policy());
    print_json(&log.append(entry)?)?;
    Ok(true)
}

pub async fn append_block(config: &AttestConfig, data: Value, data_type: DataType) -> AttestResult<bool> {
    let mut ledger = ProofOfWorkLedger::new(ledger_store(config)?, config.append_policy())
        .with_difficulty(config.ledger.difficulty);
    if let Some(timeout) = config.mining_timeout() {
        ledger = ledger.with_mining_timeout(timeout);
    }

    let hash = ledger.append_block(data, data_type).await?;
    print_json(&serde_json::json!({ "hash": hash, "height": ledger.height()? }))?;
    Ok(true)
}

pub fn recent(config: &AttestConfig, tenant_id: &str, limit: usize) -> AttestResult<bool> {
    print_json(&audit_store(config)?.recent(tenant_id, limit)?)?;
    Ok(true)
}

pub fn query(config: &AttestConfig, query: &BlockQuery) -> AttestResult<bool> {
    print_json(&ledger_store(config)?.query(query)?)?;
    Ok(true)
}

pub fn verify_chain(config: &AttestConfig, tenant_id: &str) -> AttestResult<bool> {
    print_report(&verifier(config)?.verify_chain(tenant_id)?)
}

pub fn verify_ledger(config: &AttestConfig) -> AttestResult<bool> {
    print_report(&verifier(config)?.verify_ledger()?)
}

pub fn sweep(config: &AttestConfig) -> AttestResult<bool> {
    let sweep = verifier(config)?.sweep()?;
    print_json(&sweep)?;
    Ok(sweep.is_clean())
}
