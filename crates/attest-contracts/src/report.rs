//! Integrity verification results.
//!
//! The verifier never answers with a bare boolean.  A failing report names
//! the earliest offending position and what kind of damage was found there,
//! so operators can bound their exposure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the verifier found wrong at the failing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The stored digest differs from the one recomputed from the stored
    /// fields: the record was edited in place.
    HashMismatch,

    /// The record does not reference its actual predecessor: something was
    /// inserted, deleted, or reordered.
    ChainBreak,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::HashMismatch => f.write_str("hash mismatch"),
            FailureKind::ChainBreak => f.write_str("chain break"),
        }
    }
}

/// The first point at which a chain failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityFailure {
    /// Zero-based position in the chain (tenant sequence or block index walk).
    pub index: u64,
    pub kind: FailureKind,
    /// The value the verifier derived.
    pub expected: String,
    /// The value found in storage.
    pub actual: String,
}

/// The outcome of verifying one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub ok: bool,
    /// Records that passed before the walk stopped (all of them when `ok`).
    pub checked: u64,
    pub first_failure: Option<IntegrityFailure>,
}

impl IntegrityReport {
    pub fn passed(checked: u64) -> Self {
        Self {
            ok: true,
            checked,
            first_failure: None,
        }
    }

    pub fn failed(checked: u64, failure: IntegrityFailure) -> Self {
        Self {
            ok: false,
            checked,
            first_failure: Some(failure),
        }
    }

    /// Index of the first failing record, if any.
    pub fn first_failure_index(&self) -> Option<u64> {
        self.first_failure.as_ref().map(|f| f.index)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.first_failure.as_ref().map(|f| f.kind)
    }
}

/// Reports for every tenant chain plus the global ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// `(tenant_id, report)` in tenant order.
    pub tenants: Vec<(String, IntegrityReport)>,
    pub ledger: IntegrityReport,
}

impl SweepReport {
    /// True when every chain verified.
    pub fn is_clean(&self) -> bool {
        self.ledger.ok && self.tenants.iter().all(|(_, report)| report.ok)
    }

    /// Tenants whose chains failed verification.
    pub fn failing_tenants(&self) -> impl Iterator<Item = &str> {
        self.tenants
            .iter()
            .filter(|(_, report)| !report.ok)
            .map(|(tenant, _)| tenant.as_str())
    }
}
