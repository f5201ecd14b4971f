//! The `demo` command: both chain scenarios against in-memory stores.
//!
//! Scenario 1 appends three audit entries, verifies them, overwrites the
//! second entry's diff behind the log's back, and verifies again.
//! Scenario 2 mines two security-event blocks, verifies the ledger, and
//! queries the blocks back.
//!
//! Returns `Ok(false)` if either scenario does not end the way it should.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use attest_audit::{InMemoryAuditStore, SequentialAuditLog};
use attest_config::AttestConfig;
use attest_contracts::{
    block::{BlockQuery, DataType},
    entry::NewAuditEntry,
    error::AttestResult,
    policy::AppendPolicy,
    report::{FailureKind, IntegrityReport},
};
use attest_core::traits::AuditStore;
use attest_ledger::{InMemoryLedgerStore, ProofOfWorkLedger, DEFAULT_DIFFICULTY};
use attest_verify::IntegrityVerifier;

pub async fn run(config: Option<&AttestConfig>) -> AttestResult<bool> {
    let policy = config
        .map(AttestConfig::append_policy)
        .unwrap_or_else(|| AppendPolicy::new(3, Duration::from_millis(10)));
    let difficulty = config
        .map(|c| c.ledger.difficulty)
        .unwrap_or(DEFAULT_DIFFICULTY);

    print_banner(difficulty);

    let audit_ok = audit_scenario(policy)?;
    let ledger_ok = ledger_scenario(policy, difficulty).await?;

    if audit_ok && ledger_ok {
        println!("Both scenarios behaved as expected.");
    } else {
        println!("A scenario did NOT behave as expected.");
    }
    Ok(audit_ok && ledger_ok)
}

// ── Scenario 1 ────────────────────────────────────────────────────────────────

fn audit_scenario(policy: AppendPolicy) -> AttestResult<bool> {
    println!("=== Scenario 1: Sequential audit log ===");
    println!();

    let store = Arc::new(InMemoryAuditStore::new());
    let log = SequentialAuditLog::new(Arc::clone(&store), policy);

    for (action, amount) in [("create", 100), ("update", 250), ("delete", 0)] {
        let link = log.append(
            NewAuditEntry::new("t1", action)
                .actor("operator-1")
                .entity("invoice")
                .entity_id("inv-1001")
                .diff(json!({ "amount": amount })),
        )?;
        println!("  Appended {:<8} hash {}", action, short(&link.hash));
    }

    let verifier = IntegrityVerifier::new(store.clone(), Arc::new(InMemoryLedgerStore::new()));
    let before = verifier.verify_chain("t1")?;
    print_report("  Verify before tampering:", &before);

    // Overwrite entry 2's diff directly in storage.
    let mut rows = store.entries("t1")?;
    rows[1].diff = json!({ "amount": 1 });
    let tampered = IntegrityVerifier::new(
        Arc::new(InMemoryAuditStore::from_entries(rows)),
        Arc::new(InMemoryLedgerStore::new()),
    );
    let after = tampered.verify_chain("t1")?;
    print_report("  Verify after tampering: ", &after);

    let ok = before.ok
        && after.first_failure_index() == Some(1)
        && after.failure_kind() == Some(FailureKind::HashMismatch);
    println!("  RESULT: {}", if ok { "tampering detected at entry 1 (expected)" } else { "UNEXPECTED" });
    println!();
    Ok(ok)
}

// ── Scenario 2 ────────────────────────────────────────────────────────────────

async fn ledger_scenario(policy: AppendPolicy, difficulty: u32) -> AttestResult<bool> {
    println!("=== Scenario 2: Proof-of-work ledger (difficulty {}) ===", difficulty);
    println!();

    let store = Arc::new(InMemoryLedgerStore::new());
    let ledger = ProofOfWorkLedger::new(Arc::clone(&store), policy).with_difficulty(difficulty);

    for user in ["u-17", "u-42"] {
        let hash = ledger
            .append_block(json!({ "event": "login_failed", "user": user }), DataType::SecurityEvent)
            .await?;
        println!("  Mined security_event block  hash {}", short(&hash));
    }

    let verifier = IntegrityVerifier::new(Arc::new(InMemoryAuditStore::new()), store.clone());
    let report = verifier.verify_ledger()?;
    print_report("  Verify ledger:", &report);

    let found = ledger.query(&BlockQuery::of_type(DataType::SecurityEvent))?;
    println!("  Query security_event:   {} block(s), newest first", found.len());
    for block in &found {
        println!("    #{} {}", block.index, short(&block.hash));
    }

    let newest_first = found.len() == 2 && found[0].index > found[1].index;
    let ok = report.ok && newest_first;
    println!("  RESULT: {}", if ok { "ledger verified (expected)" } else { "UNEXPECTED" });
    println!();
    Ok(ok)
}

// ── Output helpers ────────────────────────────────────────────────────────────

fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

fn print_report(label: &str, report: &IntegrityReport) {
    match &report.first_failure {
        None => println!("{} OK ({} checked)", label, report.checked),
        Some(failure) => println!(
            "{} FAILED at index {} ({})",
            label, failure.index, failure.kind
        ),
    }
}

fn print_banner(difficulty: u32) {
    println!();
    println!("attest: tamper-evident audit ledger demo");
    println!("========================================");
    println!();
    println!("  audit entry hash = SHA-256(prev_hash, tenant, actor, action, entity, entity_id, diff, created_at)");
    println!("  block hash       = SHA-256(index, timestamp, data, data_type, previous_hash, nonce)");
    println!("  a block is valid when its hash starts with {} zero hex digit(s)", difficulty);
    println!();
}
