//! Pure chain walks.
//!
//! Both walks go genesis → tip and stop at the first bad record.  At each
//! position the recomputed digest is checked before the link: an entry that
//! was edited in place is reported as `HashMismatch` even though the edit
//! usually breaks the next link too.

use attest_audit::hash_entry;
use attest_contracts::{
    block::LedgerBlock,
    entry::AuditEntry,
    report::{FailureKind, IntegrityFailure, IntegrityReport},
};
use attest_ledger::hash_block;

/// Verify one tenant's entries, given oldest first.
pub fn verify_entries(entries: &[AuditEntry]) -> IntegrityReport {
    let mut expected_prev = AuditEntry::GENESIS_PREV_HASH;

    for (position, entry) in entries.iter().enumerate() {
        let index = position as u64;

        let recomputed = hash_entry(entry);
        if entry.hash != recomputed {
            return IntegrityReport::failed(
                index,
                IntegrityFailure {
                    index,
                    kind: FailureKind::HashMismatch,
                    expected: recomputed,
                    actual: entry.hash.clone(),
                },
            );
        }

        if entry.prev_hash != expected_prev {
            return IntegrityReport::failed(
                index,
                IntegrityFailure {
                    index,
                    kind: FailureKind::ChainBreak,
                    expected: expected_prev.to_string(),
                    actual: entry.prev_hash.clone(),
                },
            );
        }

        expected_prev = entry.hash.as_str();
    }

    IntegrityReport::passed(entries.len() as u64)
}

/// Verify the ledger's blocks, given in ascending index order.
///
/// A block whose `index` is not its position in the walk is a `ChainBreak`:
/// a block was removed or duplicated.  The difficulty predicate is not
/// re-checked; the recomputed hash already commits to the stored nonce.
pub fn verify_blocks(blocks: &[LedgerBlock]) -> IntegrityReport {
    let mut expected_prev = LedgerBlock::GENESIS_PREVIOUS_HASH;

    for (position, block) in blocks.iter().enumerate() {
        let index = position as u64;

        let recomputed = hash_block(block);
        if block.hash != recomputed {
            return IntegrityReport::failed(
                index,
                IntegrityFailure {
                    index,
                    kind: FailureKind::HashMismatch,
                    expected: recomputed,
                    actual: block.hash.clone(),
                },
            );
        }

        if block.index != index {
            return IntegrityReport::failed(
                index,
                IntegrityFailure {
                    index,
                    kind: FailureKind::ChainBreak,
                    expected: format!("index {index}"),
                    actual: format!("index {}", block.index),
                },
            );
        }

        if block.previous_hash != expected_prev {
            return IntegrityReport::failed(
                index,
                IntegrityFailure {
                    index,
                    kind: FailureKind::ChainBreak,
                    expected: expected_prev.to_string(),
                    actual: block.previous_hash.clone(),
                },
            );
        }

        expected_prev = block.hash.as_str();
    }

    IntegrityReport::passed(blocks.len() as u64)
}
