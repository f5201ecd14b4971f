//! Chain link encoding for audit entries.
//!
//! Preimage layout (framed per `attest_core::hasher`, in order):
//!   1. prev_hash
//!   2. tenant_id
//!   3. actor_id (optional)
//!   4. action
//!   5. entity (optional)
//!   6. entity_id (optional)
//!   7. canonical JSON of diff
//!   8. created_at
//!
//! The stored `hash` field is never part of its own preimage.

use attest_contracts::entry::AuditEntry;
use attest_core::hasher::Preimage;

/// Build the framed preimage of `entry`.
pub fn entry_preimage(entry: &AuditEntry) -> Preimage {
    Preimage::new()
        .text(&entry.prev_hash)
        .text(&entry.tenant_id)
        .optional_text(entry.actor_id.as_deref())
        .text(&entry.action)
        .optional_text(entry.entity.as_deref())
        .optional_text(entry.entity_id.as_deref())
        .json(&entry.diff)
        .timestamp(&entry.created_at)
}

/// Compute the chain hash of `entry` from its fields, ignoring `entry.hash`.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_entry(entry: &AuditEntry) -> String {
    entry_preimage(entry).digest_hex()
}
