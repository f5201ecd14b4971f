//! The sequential, per-tenant audit log.
//!
//! `SequentialAuditLog` turns a `NewAuditEntry` into a chained `AuditEntry`
//! and persists it through an `AuditStore`.  Two mechanisms keep a tenant's
//! chain from forking:
//!
//! - an in-process mutex per tenant, held across read-tip → hash → write, so
//!   appends through the same log never race each other;
//! - the store's conditional append, which rejects an entry whose
//!   `prev_hash` no longer matches the tip (another process won the race).
//!   The log then re-reads the tip and retries per its `AppendPolicy`.
//!
//! A failed tip read aborts the append before anything is written.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{SubsecRound, Utc};
use tracing::{debug, info, warn};

use attest_contracts::{
    entry::{AuditEntry, ChainLink, NewAuditEntry},
    error::{AttestError, AttestResult},
    policy::AppendPolicy,
};
use attest_core::traits::{tenant_chain, AuditStore};

use crate::chain::hash_entry;

/// Append-only, hash-chained audit log over an `AuditStore`.
///
/// Cheap to share: wrap in an `Arc` and call `append` from any thread.
/// A tenant's lock lives only while an append for that tenant is in
/// flight, so the lock table stays as small as the current concurrency.
pub struct SequentialAuditLog<S: AuditStore> {
    store: Arc<S>,
    policy: AppendPolicy,
    tenant_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: AuditStore> SequentialAuditLog<S> {
    pub fn new(store: Arc<S>, policy: AppendPolicy) -> Self {
        Self {
            store,
            policy,
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Chain `event` onto its tenant's log and persist it.
    ///
    /// Returns the new entry's `prev_hash` and `hash`.
    ///
    /// # Errors
    ///
    /// - `ReadFailure` if the tip could not be read (nothing written)
    /// - `AppendRetriesExhausted` if every allowed attempt lost a race
    /// - any write error reported by the store
    pub fn append(&self, event: NewAuditEntry) -> AttestResult<ChainLink> {
        let lock = self.tenant_lock(&event.tenant_id)?;
        let result = match lock.lock() {
            Ok(_guard) => self.append_locked(&event),
            Err(e) => Err(AttestError::WriteFailure {
                reason: format!("tenant lock poisoned: {}", e),
            }),
        };
        drop(lock);
        self.release_tenant_lock(&event.tenant_id);
        result
    }

    /// The retry loop; the caller holds the tenant's lock.
    fn append_locked(&self, event: &NewAuditEntry) -> AttestResult<ChainLink> {
        for attempt in 1..=self.policy.max_attempts {
            let entry = self.chain_onto_tip(event)?;
            let link = ChainLink {
                prev_hash: entry.prev_hash.clone(),
                hash: entry.hash.clone(),
            };

            match self.store.append_if_tip(entry) {
                Ok(()) => {
                    info!(
                        tenant_id = %event.tenant_id,
                        action = %event.action,
                        hash = %link.hash,
                        "audit entry appended"
                    );
                    return Ok(link);
                }
                Err(AttestError::WriteConflict { chain }) => {
                    warn!(
                        chain = %chain,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "audit append lost race for tip; retrying"
                    );
                    if attempt < self.policy.max_attempts {
                        std::thread::sleep(self.policy.delay_after(attempt));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(AttestError::AppendRetriesExhausted {
            chain: tenant_chain(&event.tenant_id),
            attempts: self.policy.max_attempts,
        })
    }

    /// Up to `limit` of the tenant's entries, newest first.
    pub fn recent(&self, tenant_id: &str, limit: usize) -> AttestResult<Vec<AuditEntry>> {
        self.store.recent(tenant_id, limit)
    }

    /// Read the tip and build the hashed entry that would follow it.
    fn chain_onto_tip(&self, event: &NewAuditEntry) -> AttestResult<AuditEntry> {
        let tip = self.store.tip(&event.tenant_id)?;

        // Never date an entry before its predecessor, even if the clock
        // stepped backwards.
        let now = Utc::now().trunc_subsecs(6);
        let created_at = match &tip {
            Some(tip) if tip.created_at > now => tip.created_at,
            _ => now,
        };

        let mut entry = AuditEntry {
            tenant_id: event.tenant_id.clone(),
            actor_id: event.actor_id.clone(),
            action: event.action.clone(),
            entity: event.entity.clone(),
            entity_id: event.entity_id.clone(),
            diff: event.diff.clone(),
            prev_hash: tip.map(|t| t.hash).unwrap_or_default(),
            hash: String::new(),
            created_at,
        };
        entry.hash = hash_entry(&entry);

        debug!(
            tenant_id = %entry.tenant_id,
            prev_hash = %entry.prev_hash,
            hash = %entry.hash,
            "computed chain hash"
        );

        Ok(entry)
    }

    fn tenant_lock(&self, tenant_id: &str) -> AttestResult<Arc<Mutex<()>>> {
        let mut locks = self.tenant_locks.lock().map_err(|e| AttestError::WriteFailure {
            reason: format!("tenant lock table poisoned: {}", e),
        })?;
        Ok(locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Drop the tenant's table entry once no append holds a handle to it.
    ///
    /// Handles are only cloned under the table lock, so a count of one seen
    /// here cannot grow before the entry is removed.
    fn release_tenant_lock(&self, tenant_id: &str) {
        let Ok(mut locks) = self.tenant_locks.lock() else {
            return;
        };
        if locks
            .get(tenant_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(tenant_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn held_tenant_locks(&self) -> usize {
        self.tenant_locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}
