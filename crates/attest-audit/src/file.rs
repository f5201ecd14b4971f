//! Durable `AuditStore` over an append-only JSONL file.
//!
//! Every tenant shares one file; each line is one `AuditEntry` using the
//! audit table column names.  The file is read once on open to rebuild the
//! per-tenant index, and the tip check plus the line write in
//! `append_if_tip` happen under one mutex so the conditional append is
//! atomic for every writer going through this store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use attest_contracts::{
    entry::AuditEntry,
    error::{AttestError, AttestResult},
};
use attest_core::{
    jsonl::JsonlFile,
    traits::{entry_extends, tenant_chain, AuditStore},
};

struct FileState {
    file: JsonlFile,
    chains: BTreeMap<String, Vec<AuditEntry>>,
}

/// A file-backed audit store.
pub struct JsonlAuditStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl JsonlAuditStore {
    /// Open or create the audit file at `path`.
    ///
    /// Rows are loaded as stored; nothing is verified here.  Run the
    /// integrity verifier to check what was loaded.
    pub fn open(path: impl AsRef<Path>) -> AttestResult<Self> {
        let (file, rows) = JsonlFile::open::<AuditEntry>(path.as_ref())?;

        let mut chains: BTreeMap<String, Vec<AuditEntry>> = BTreeMap::new();
        for row in rows {
            chains.entry(row.tenant_id.clone()).or_default().push(row);
        }

        debug!(path = %path.as_ref().display(), tenants = chains.len(), "audit store opened");

        Ok(Self {
            path: file.path().to_path_buf(),
            state: Mutex::new(FileState { file, chains }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> AttestResult<MutexGuard<'_, FileState>> {
        self.state.lock().map_err(|e| AttestError::ReadFailure {
            reason: format!("audit file lock poisoned: {}", e),
        })
    }
}

impl AuditStore for JsonlAuditStore {
    fn tip(&self, tenant_id: &str) -> AttestResult<Option<AuditEntry>> {
        Ok(self
            .lock()?
            .chains
            .get(tenant_id)
            .and_then(|chain| chain.last().cloned()))
    }

    fn append_if_tip(&self, entry: AuditEntry) -> AttestResult<()> {
        let mut state = self.lock()?;

        let tip = state.chains.get(&entry.tenant_id).and_then(|c| c.last());
        if !entry_extends(tip, &entry) {
            return Err(AttestError::WriteConflict {
                chain: tenant_chain(&entry.tenant_id),
            });
        }

        // Only index the row once it is on disk.
        state.file.append(&entry)?;
        state
            .chains
            .entry(entry.tenant_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    fn entries(&self, tenant_id: &str) -> AttestResult<Vec<AuditEntry>> {
        Ok(self.lock()?.chains.get(tenant_id).cloned().unwrap_or_default())
    }

    fn tenants(&self) -> AttestResult<Vec<String>> {
        Ok(self.lock()?.chains.keys().cloned().collect())
    }
}
