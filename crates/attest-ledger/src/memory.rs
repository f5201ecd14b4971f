//! In-memory implementation of `LedgerStore`.

use std::sync::{Mutex, MutexGuard};

use attest_contracts::{
    block::LedgerBlock,
    error::{AttestError, AttestResult},
};
use attest_core::traits::{block_extends, LedgerStore, LEDGER_CHAIN};

/// A process-local ledger store.  Blocks live in a `Vec` in index order.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    blocks: Mutex<Vec<LedgerBlock>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with already-persisted blocks, kept exactly as given.
    pub fn from_blocks(blocks: impl IntoIterator<Item = LedgerBlock>) -> Self {
        Self {
            blocks: Mutex::new(blocks.into_iter().collect()),
        }
    }

    fn lock(&self) -> AttestResult<MutexGuard<'_, Vec<LedgerBlock>>> {
        self.blocks.lock().map_err(|e| AttestError::ReadFailure {
            reason: format!("ledger store lock poisoned: {}", e),
        })
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn tip(&self) -> AttestResult<Option<LedgerBlock>> {
        Ok(self.lock()?.last().cloned())
    }

    fn append_if_tip(&self, block: LedgerBlock) -> AttestResult<()> {
        let mut blocks = self.lock()?;
        if !block_extends(blocks.last(), &block) {
            return Err(AttestError::WriteConflict {
                chain: LEDGER_CHAIN.to_string(),
            });
        }
        blocks.push(block);
        Ok(())
    }

    fn blocks(&self) -> AttestResult<Vec<LedgerBlock>> {
        Ok(self.lock()?.clone())
    }
}
