//! Storage traits for the two chains.
//!
//! - `AuditStore`: durable home of the per-tenant audit chains
//! - `LedgerStore`: durable home of the global proof-of-work ledger
//!
//! Both expose exactly what the appenders and the verifier need: read the
//! tip, read the ordered sequence, and append **conditionally**.  A
//! conditional append must be atomic with respect to other appends on the
//! same chain: it succeeds only if the record still extends the current tip,
//! and otherwise returns `AttestError::WriteConflict` without writing.
//! Stores never update or delete records.

use attest_contracts::{
    block::{BlockQuery, LedgerBlock},
    entry::AuditEntry,
    error::AttestResult,
};

/// Chain label used in conflict errors and logs for a tenant's audit chain.
pub fn tenant_chain(tenant_id: &str) -> String {
    format!("tenant:{tenant_id}")
}

/// Chain label used in conflict errors and logs for the global ledger.
pub const LEDGER_CHAIN: &str = "ledger";

/// True when `entry` links to `tip` (or to genesis when the chain is empty).
pub fn entry_extends(tip: Option<&AuditEntry>, entry: &AuditEntry) -> bool {
    match tip {
        Some(tip) => entry.prev_hash == tip.hash,
        None => entry.prev_hash == AuditEntry::GENESIS_PREV_HASH,
    }
}

/// True when `block` takes the next index after `tip` and links to it.
pub fn block_extends(tip: Option<&LedgerBlock>, block: &LedgerBlock) -> bool {
    match tip {
        Some(tip) => block.index == tip.index + 1 && block.previous_hash == tip.hash,
        None => block.index == 0 && block.previous_hash == LedgerBlock::GENESIS_PREVIOUS_HASH,
    }
}

/// Durable storage for per-tenant audit chains.
pub trait AuditStore: Send + Sync {
    /// The most recent entry for `tenant_id`, or `None` for an empty chain.
    fn tip(&self, tenant_id: &str) -> AttestResult<Option<AuditEntry>>;

    /// Persist `entry` if its `prev_hash` still references the tenant's tip.
    ///
    /// Returns `WriteConflict` when another writer got there first.
    fn append_if_tip(&self, entry: AuditEntry) -> AttestResult<()>;

    /// Every entry for `tenant_id`, oldest first.
    fn entries(&self, tenant_id: &str) -> AttestResult<Vec<AuditEntry>>;

    /// Up to `limit` entries for `tenant_id`, newest first.
    fn recent(&self, tenant_id: &str, limit: usize) -> AttestResult<Vec<AuditEntry>> {
        let mut entries = self.entries(tenant_id)?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Every tenant that has at least one entry, sorted.
    fn tenants(&self) -> AttestResult<Vec<String>>;
}

/// Durable storage for the global block ledger.
pub trait LedgerStore: Send + Sync {
    /// The block with the highest index, or `None` for an empty ledger.
    fn tip(&self) -> AttestResult<Option<LedgerBlock>>;

    /// Persist `block` if it is the next index and links to the current tip.
    ///
    /// Returns `WriteConflict` when another writer got there first.
    fn append_if_tip(&self, block: LedgerBlock) -> AttestResult<()>;

    /// Every block, ascending by index.
    fn blocks(&self) -> AttestResult<Vec<LedgerBlock>>;

    /// Blocks matching `query`, newest first, truncated to `query.limit`.
    fn query(&self, query: &BlockQuery) -> AttestResult<Vec<LedgerBlock>> {
        let mut matched: Vec<LedgerBlock> = self
            .blocks()?
            .into_iter()
            .rev()
            .filter(|block| query.matches(block))
            .collect();
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}
