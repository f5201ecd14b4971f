//! Store-backed integrity verification.
//!
//! `IntegrityVerifier` reads a full chain from storage and hands it to the
//! pure walks in `walk`.  It never writes.  A storage read error is returned
//! as an error, not as a failing report: an unreadable chain is not evidence
//! of tampering.

use std::sync::Arc;

use tracing::{error, info};

use attest_contracts::{
    error::AttestResult,
    report::{IntegrityReport, SweepReport},
};
use attest_core::traits::{tenant_chain, AuditStore, LedgerStore, LEDGER_CHAIN};

use crate::walk::{verify_blocks, verify_entries};

/// Verifies the audit chains and the ledger held by a pair of stores.
pub struct IntegrityVerifier {
    audit: Arc<dyn AuditStore>,
    ledger: Arc<dyn LedgerStore>,
}

impl IntegrityVerifier {
    pub fn new(audit: Arc<dyn AuditStore>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { audit, ledger }
    }

    /// Verify every entry of `tenant_id`'s chain, oldest to newest.
    ///
    /// An unknown tenant has an empty chain, which verifies.
    pub fn verify_chain(&self, tenant_id: &str) -> AttestResult<IntegrityReport> {
        let entries = self.audit.entries(tenant_id)?;
        let report = verify_entries(&entries);
        log_report(&tenant_chain(tenant_id), &report);
        Ok(report)
    }

    /// Verify every ledger block, lowest index first.
    pub fn verify_ledger(&self) -> AttestResult<IntegrityReport> {
        let blocks = self.ledger.blocks()?;
        let report = verify_blocks(&blocks);
        log_report(LEDGER_CHAIN, &report);
        Ok(report)
    }

    /// Verify every tenant chain and the ledger.
    ///
    /// A failing chain does not stop the sweep; every chain gets a report.
    pub fn sweep(&self) -> AttestResult<SweepReport> {
        let tenants = self
            .audit
            .tenants()?
            .into_iter()
            .map(|tenant| {
                let report = self.verify_chain(&tenant)?;
                Ok((tenant, report))
            })
            .collect::<AttestResult<Vec<_>>>()?;
        let ledger = self.verify_ledger()?;

        let sweep = SweepReport { tenants, ledger };
        info!(
            tenants = sweep.tenants.len(),
            failing = sweep.failing_tenants().count(),
            ledger_ok = sweep.ledger.ok,
            "integrity sweep finished"
        );
        Ok(sweep)
    }
}

fn log_report(chain: &str, report: &IntegrityReport) {
    match &report.first_failure {
        None => info!(chain, checked = report.checked, "chain verified"),
        Some(failure) => error!(
            chain,
            index = failure.index,
            kind = %failure.kind,
            expected = %failure.expected,
            actual = %failure.actual,
            "chain integrity failure"
        ),
    }
}
