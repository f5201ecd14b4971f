//! # attest-audit
//!
//! Per-tenant, append-only, SHA-256 hash-chained audit log.
//!
//! ## Overview
//!
//! Every entry a business collaborator records is wrapped in an `AuditEntry`
//! that links to the tenant's previous entry via its hash.  Editing any
//! stored entry, even a single byte of its diff, changes its recomputed
//! hash and is detected by the integrity verifier.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use attest_audit::{InMemoryAuditStore, SequentialAuditLog};
//! use attest_contracts::{entry::NewAuditEntry, policy::AppendPolicy};
//!
//! let log = SequentialAuditLog::new(Arc::new(InMemoryAuditStore::new()), policy);
//! let link = log.append(NewAuditEntry::new("t1", "create").entity("invoice"))?;
//! ```

pub mod chain;
pub mod file;
pub mod log;
pub mod memory;

pub use chain::{entry_preimage, hash_entry};
pub use file::JsonlAuditStore;
pub use log::SequentialAuditLog;
pub use memory::InMemoryAuditStore;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use chrono::{Duration as ChronoDuration, SubsecRound, Utc};
    use serde_json::json;

    use attest_contracts::{
        entry::{AuditEntry, NewAuditEntry},
        error::{AttestError, AttestResult},
        policy::AppendPolicy,
    };
    use attest_core::traits::AuditStore;

    use super::{hash_entry, InMemoryAuditStore, JsonlAuditStore, SequentialAuditLog};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn policy() -> AppendPolicy {
        AppendPolicy::new(3, Duration::ZERO)
    }

    fn memory_log() -> SequentialAuditLog<InMemoryAuditStore> {
        SequentialAuditLog::new(Arc::new(InMemoryAuditStore::new()), policy())
    }

    /// Assert every entry re-hashes to its stored hash and links to its
    /// predecessor.
    fn assert_linked(entries: &[AuditEntry]) {
        let mut expected_prev = String::new();
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.prev_hash, expected_prev, "entry {i} does not link to its predecessor");
            assert_eq!(entry.hash, hash_entry(entry), "entry {i} does not re-hash");
            expected_prev = entry.hash.clone();
        }
    }

    fn sample_entry() -> AuditEntry {
        let mut entry = AuditEntry {
            tenant_id: "t1".to_string(),
            actor_id: Some("user-1".to_string()),
            action: "update".to_string(),
            entity: Some("ticket".to_string()),
            entity_id: Some("tk-7".to_string()),
            diff: json!({ "status": ["open", "closed"], "priority": 2 }),
            prev_hash: "ab".repeat(32),
            hash: String::new(),
            created_at: Utc::now().trunc_subsecs(6),
        };
        entry.hash = hash_entry(&entry);
        entry
    }

    /// A store whose tip read always fails.
    struct UnreadableStore {
        inner: InMemoryAuditStore,
    }

    impl AuditStore for UnreadableStore {
        fn tip(&self, _tenant_id: &str) -> AttestResult<Option<AuditEntry>> {
            Err(AttestError::ReadFailure {
                reason: "replica unavailable".to_string(),
            })
        }
        fn append_if_tip(&self, entry: AuditEntry) -> AttestResult<()> {
            self.inner.append_if_tip(entry)
        }
        fn entries(&self, tenant_id: &str) -> AttestResult<Vec<AuditEntry>> {
            self.inner.entries(tenant_id)
        }
        fn tenants(&self) -> AttestResult<Vec<String>> {
            self.inner.tenants()
        }
    }

    /// A store where a rival writer commits right before each of our next
    /// `races` appends, as if another process read the same tip.
    struct RacingStore {
        inner: InMemoryAuditStore,
        races: AtomicU32,
    }

    impl RacingStore {
        fn new(races: u32) -> Self {
            Self {
                inner: InMemoryAuditStore::new(),
                races: AtomicU32::new(races),
            }
        }
    }

    impl AuditStore for RacingStore {
        fn tip(&self, tenant_id: &str) -> AttestResult<Option<AuditEntry>> {
            self.inner.tip(tenant_id)
        }
        fn append_if_tip(&self, entry: AuditEntry) -> AttestResult<()> {
            let raced = self
                .races
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if raced {
                let mut rival = entry.clone();
                rival.action = "rival".to_string();
                rival.hash = hash_entry(&rival);
                self.inner.append_if_tip(rival)?;
            }
            self.inner.append_if_tip(entry)
        }
        fn entries(&self, tenant_id: &str) -> AttestResult<Vec<AuditEntry>> {
            self.inner.entries(tenant_id)
        }
        fn tenants(&self) -> AttestResult<Vec<String>> {
            self.inner.tenants()
        }
    }

    // ── Chain hashing ─────────────────────────────────────────────────────────

    /// Identical fields always produce the identical hash.
    #[test]
    fn test_hash_is_deterministic() {
        let entry = sample_entry();
        assert_eq!(hash_entry(&entry), hash_entry(&entry.clone()));
        assert_eq!(entry.hash.len(), 64);
    }

    /// Reordering the keys of the diff does not change the hash.
    #[test]
    fn test_diff_key_order_is_irrelevant() {
        let a = sample_entry();
        let mut b = a.clone();
        b.diff = json!({ "priority": 2, "status": ["open", "closed"] });
        assert_eq!(hash_entry(&a), hash_entry(&b));
    }

    /// Changing any single persisted field changes the recomputed hash.
    #[test]
    fn test_every_field_is_committed() {
        let base = sample_entry();
        let mutations: [(&str, fn(&mut AuditEntry)); 8] = [
            ("tenant_id", |e: &mut AuditEntry| e.tenant_id = "t2".to_string()),
            ("actor_id", |e: &mut AuditEntry| e.actor_id = None),
            ("action", |e: &mut AuditEntry| e.action = "delete".to_string()),
            ("entity", |e: &mut AuditEntry| e.entity = Some("invoice".to_string())),
            ("entity_id", |e: &mut AuditEntry| e.entity_id = Some("tk-8".to_string())),
            ("diff", |e: &mut AuditEntry| e.diff = json!({ "status": ["open", "reopened"], "priority": 2 })),
            ("prev_hash", |e: &mut AuditEntry| e.prev_hash = "cd".repeat(32)),
            ("created_at", |e: &mut AuditEntry| e.created_at += ChronoDuration::microseconds(1)),
        ];

        for (field, mutate) in mutations {
            let mut tampered = base.clone();
            mutate(&mut tampered);
            assert_ne!(
                hash_entry(&tampered),
                base.hash,
                "mutating {field} must change the hash"
            );
        }
    }

    /// A sub-microsecond edit to `created_at` survives a JSON round trip, so
    /// the hash must commit to it.
    #[test]
    fn test_sub_microsecond_created_at_is_committed() {
        let base = sample_entry();
        let mut tampered = base.clone();
        tampered.created_at += ChronoDuration::nanoseconds(999);

        let reloaded: AuditEntry =
            serde_json::from_str(&serde_json::to_string(&tampered).unwrap()).unwrap();
        assert_eq!(reloaded.created_at, tampered.created_at);
        assert_ne!(hash_entry(&reloaded), base.hash);
    }

    /// Replacing a diff with a string of its own canonical text changes the
    /// hash.
    #[test]
    fn test_retyped_diff_is_committed() {
        let mut base = sample_entry();
        base.diff = json!({});
        base.hash = hash_entry(&base);

        let mut tampered = base.clone();
        tampered.diff = json!("{}");
        assert_ne!(hash_entry(&tampered), base.hash);

        base.diff = json!(1);
        tampered.diff = json!("1");
        assert_ne!(hash_entry(&tampered), hash_entry(&base));
    }

    // ── Appending ─────────────────────────────────────────────────────────────

    /// The first entry of a tenant links to the empty genesis hash.
    #[test]
    fn test_genesis_prev_hash_is_empty() {
        let log = memory_log();
        let link = log.append(NewAuditEntry::new("t1", "create")).unwrap();

        assert_eq!(link.prev_hash, "");
        let entries = log.store().entries("t1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].prev_hash, AuditEntry::GENESIS_PREV_HASH);
        assert_eq!(entries[0].hash, link.hash);
    }

    /// Sequential appends form a valid chain and return the stored digests.
    #[test]
    fn test_sequential_appends_chain() {
        let log = memory_log();
        let first = log
            .append(NewAuditEntry::new("t1", "create").entity("ticket").entity_id("tk-1"))
            .unwrap();
        let second = log
            .append(NewAuditEntry::new("t1", "update").diff(json!({ "status": "closed" })))
            .unwrap();
        let third = log.append(NewAuditEntry::new("t1", "delete").actor("admin")).unwrap();

        assert_eq!(second.prev_hash, first.hash);
        assert_eq!(third.prev_hash, second.hash);

        let entries = log.store().entries("t1").unwrap();
        assert_eq!(entries.len(), 3);
        assert_linked(&entries);
        assert!(entries.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    /// Each tenant has its own independent chain.
    #[test]
    fn test_tenants_are_independent() {
        let log = memory_log();
        log.append(NewAuditEntry::new("t1", "create")).unwrap();
        log.append(NewAuditEntry::new("t1", "update")).unwrap();
        let other = log.append(NewAuditEntry::new("t2", "create")).unwrap();

        assert_eq!(other.prev_hash, "", "t2 starts its own chain");
        assert_eq!(log.store().tenants().unwrap(), vec!["t1", "t2"]);
    }

    /// `recent` lists a tenant's entries newest first.
    #[test]
    fn test_recent_is_newest_first() {
        let log = memory_log();
        for action in ["create", "update", "delete"] {
            log.append(NewAuditEntry::new("t1", action)).unwrap();
        }

        let recent = log.recent("t1", 2).unwrap();
        let actions: Vec<&str> = recent.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["delete", "update"]);
    }

    /// A tip dated in the future never yields an earlier successor.
    #[test]
    fn test_created_at_never_precedes_tip() {
        let mut future = sample_entry();
        future.prev_hash = String::new();
        future.created_at = Utc::now().trunc_subsecs(6) + ChronoDuration::hours(1);
        future.hash = hash_entry(&future);

        let store = Arc::new(InMemoryAuditStore::from_entries([future.clone()]));
        let log = SequentialAuditLog::new(store, policy());
        log.append(NewAuditEntry::new("t1", "update")).unwrap();

        let entries = log.store().entries("t1").unwrap();
        assert_eq!(entries[1].created_at, future.created_at);
        assert_linked(&entries);
    }

    // ── Failure handling ──────────────────────────────────────────────────────

    /// A failed tip read aborts the append and writes nothing.
    #[test]
    fn test_unreadable_tip_fails_closed() {
        let store = Arc::new(UnreadableStore {
            inner: InMemoryAuditStore::new(),
        });
        let log = SequentialAuditLog::new(store.clone(), policy());

        let err = log.append(NewAuditEntry::new("t1", "create")).unwrap_err();

        assert!(matches!(err, AttestError::ReadFailure { .. }), "got {:?}", err);
        assert!(store.inner.entries("t1").unwrap().is_empty());
    }

    /// A lost race is retried against the fresh tip instead of forking.
    #[test]
    fn test_lost_race_is_retried_without_fork() {
        let store = Arc::new(RacingStore::new(1));
        let log = SequentialAuditLog::new(store.clone(), policy());

        let link = log.append(NewAuditEntry::new("t1", "create")).unwrap();

        let entries = store.entries("t1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "rival");
        assert_eq!(link.prev_hash, entries[0].hash);
        assert_linked(&entries);
    }

    /// When every attempt loses, the append surfaces a transient error.
    #[test]
    fn test_retries_are_bounded() {
        let store = Arc::new(RacingStore::new(u32::MAX));
        let log = SequentialAuditLog::new(store.clone(), AppendPolicy::new(2, Duration::ZERO));

        let err = log.append(NewAuditEntry::new("t1", "create")).unwrap_err();

        match &err {
            AttestError::AppendRetriesExhausted { chain, attempts } => {
                assert_eq!(chain, "tenant:t1");
                assert_eq!(*attempts, 2);
            }
            other => panic!("expected AppendRetriesExhausted, got {:?}", other),
        }
        assert!(err.is_transient());
        assert!(store.entries("t1").unwrap().iter().all(|e| e.action == "rival"));
    }

    // ── Concurrency ───────────────────────────────────────────────────────────

    /// Many threads appending through one log produce one unforked chain.
    #[test]
    fn test_concurrent_appends_do_not_fork() {
        let log = Arc::new(memory_log());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..10 {
                        log.append(NewAuditEntry::new("t1", format!("w{worker}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = log.store().entries("t1").unwrap();
        assert_eq!(entries.len(), 80);
        assert_linked(&entries);
        assert_eq!(log.held_tenant_locks(), 0);
    }

    /// Tenant locks are released after each append, so the lock table does
    /// not grow with the number of tenants ever seen.
    #[test]
    fn test_tenant_locks_are_released() {
        let log = Arc::new(memory_log());
        for tenant in 0..100 {
            log.append(NewAuditEntry::new(format!("tenant-{tenant}"), "create")).unwrap();
        }
        assert_eq!(log.held_tenant_locks(), 0);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..25 {
                        let tenant = format!("tenant-{}", (worker + i) % 4);
                        log.append(NewAuditEntry::new(tenant, "update")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.held_tenant_locks(), 0);
        for tenant in 0..4 {
            let entries = log.store().entries(&format!("tenant-{tenant}")).unwrap();
            assert_eq!(entries.len(), 51);
            assert_linked(&entries);
        }
    }

    /// Two independent logs (no shared lock) on one store still cannot fork:
    /// the conditional append rejects the stale writer.
    #[test]
    fn test_independent_writers_share_store_safely() {
        let store = Arc::new(InMemoryAuditStore::new());
        let retry = AppendPolicy::new(1_000, Duration::from_micros(50));

        let handles: Vec<_> = (0..2)
            .map(|worker| {
                let log = SequentialAuditLog::new(Arc::clone(&store), retry);
                thread::spawn(move || {
                    for i in 0..20 {
                        log.append(NewAuditEntry::new("t1", format!("p{worker}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = store.entries("t1").unwrap();
        assert_eq!(entries.len(), 40);
        assert_linked(&entries);
    }

    // ── File store ────────────────────────────────────────────────────────────

    /// Entries survive a reopen and the chain continues from the stored tip.
    #[test]
    fn test_file_store_persists_and_continues_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let first = {
            let log = SequentialAuditLog::new(Arc::new(JsonlAuditStore::open(&path).unwrap()), policy());
            log.append(NewAuditEntry::new("t1", "create").diff(json!({ "b": 2, "a": 1 })))
                .unwrap()
        };

        let store = Arc::new(JsonlAuditStore::open(&path).unwrap());
        let log = SequentialAuditLog::new(Arc::clone(&store), policy());
        let second = log.append(NewAuditEntry::new("t1", "update")).unwrap();

        assert_eq!(second.prev_hash, first.hash);
        let entries = store.entries("t1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_linked(&entries);
    }

    /// The file store rejects an entry that does not extend its tip.
    #[test]
    fn test_file_store_rejects_stale_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlAuditStore::open(dir.path().join("audit.jsonl")).unwrap();

        let stale = sample_entry(); // links to a hash that is not the tip
        let err = store.append_if_tip(stale).unwrap_err();

        assert!(matches!(err, AttestError::WriteConflict { .. }), "got {:?}", err);
        assert!(store.tenants().unwrap().is_empty());
    }

    /// An entry torn off mid-write is dropped on reopen and the chain
    /// continues from the last whole entry.
    #[test]
    fn test_file_store_recovers_from_torn_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let first = {
            let log = SequentialAuditLog::new(Arc::new(JsonlAuditStore::open(&path).unwrap()), policy());
            log.append(NewAuditEntry::new("t1", "create")).unwrap()
        };

        let mut torn = sample_entry();
        torn.prev_hash = first.hash.clone();
        let line = serde_json::to_string(&torn).unwrap();
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        std::io::Write::write_all(&mut file, line[..line.len() - 7].as_bytes()).unwrap();
        drop(file);

        let store = Arc::new(JsonlAuditStore::open(&path).unwrap());
        assert_eq!(store.tip("t1").unwrap().unwrap().hash, first.hash);

        let log = SequentialAuditLog::new(Arc::clone(&store), policy());
        let second = log.append(NewAuditEntry::new("t1", "update")).unwrap();
        assert_eq!(second.prev_hash, first.hash);

        let reopened = JsonlAuditStore::open(&path).unwrap();
        let entries = reopened.entries("t1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_linked(&entries);
    }
}
