//! In-memory implementation of `AuditStore`.
//!
//! `InMemoryAuditStore` is the reference store.  Each tenant's chain is a
//! `Vec` in append order, and the whole map sits behind one `Mutex`, which
//! makes the tip comparison and the push in `append_if_tip` a single atomic
//! step.

use std::collections::BTreeMap;
use std::sync::Mutex;

use attest_contracts::{
    entry::AuditEntry,
    error::{AttestError, AttestResult},
};
use attest_core::traits::{entry_extends, tenant_chain, AuditStore};

/// A process-local audit store.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    chains: Mutex<BTreeMap<String, Vec<AuditEntry>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with already-persisted rows, kept exactly as given.
    ///
    /// Rows are grouped by tenant in iteration order and are not validated;
    /// this is how an existing table, tampered or not, is loaded for
    /// verification.
    pub fn from_entries(entries: impl IntoIterator<Item = AuditEntry>) -> Self {
        let mut chains: BTreeMap<String, Vec<AuditEntry>> = BTreeMap::new();
        for entry in entries {
            chains.entry(entry.tenant_id.clone()).or_default().push(entry);
        }
        Self {
            chains: Mutex::new(chains),
        }
    }

    fn lock(&self) -> AttestResult<std::sync::MutexGuard<'_, BTreeMap<String, Vec<AuditEntry>>>> {
        self.chains.lock().map_err(|e| AttestError::ReadFailure {
            reason: format!("audit store lock poisoned: {}", e),
        })
    }
}

impl AuditStore for InMemoryAuditStore {
    fn tip(&self, tenant_id: &str) -> AttestResult<Option<AuditEntry>> {
        Ok(self
            .lock()?
            .get(tenant_id)
            .and_then(|chain| chain.last().cloned()))
    }

    fn append_if_tip(&self, entry: AuditEntry) -> AttestResult<()> {
        let mut chains = self.lock()?;
        let chain = chains.entry(entry.tenant_id.clone()).or_default();

        if !entry_extends(chain.last(), &entry) {
            return Err(AttestError::WriteConflict {
                chain: tenant_chain(&entry.tenant_id),
            });
        }

        chain.push(entry);
        Ok(())
    }

    fn entries(&self, tenant_id: &str) -> AttestResult<Vec<AuditEntry>> {
        Ok(self.lock()?.get(tenant_id).cloned().unwrap_or_default())
    }

    fn tenants(&self) -> AttestResult<Vec<String>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(_, chain)| !chain.is_empty())
            .map(|(tenant, _)| tenant.clone())
            .collect())
    }
}
