//! Durable `LedgerStore` over an append-only JSONL file.
//!
//! One line per block, using the ledger table column names.  The tip check
//! and the line write happen under one mutex.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use attest_contracts::{
    block::LedgerBlock,
    error::{AttestError, AttestResult},
};
use attest_core::{
    jsonl::JsonlFile,
    traits::{block_extends, LedgerStore, LEDGER_CHAIN},
};

struct FileState {
    file: JsonlFile,
    blocks: Vec<LedgerBlock>,
}

/// A file-backed ledger store.
pub struct JsonlLedgerStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl JsonlLedgerStore {
    /// Open or create the ledger file at `path`.  Blocks are loaded in file
    /// order and are not verified here.
    pub fn open(path: impl AsRef<Path>) -> AttestResult<Self> {
        let (file, blocks) = JsonlFile::open::<LedgerBlock>(path.as_ref())?;
        debug!(path = %path.as_ref().display(), blocks = blocks.len(), "ledger store opened");

        Ok(Self {
            path: file.path().to_path_buf(),
            state: Mutex::new(FileState { file, blocks }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> AttestResult<MutexGuard<'_, FileState>> {
        self.state.lock().map_err(|e| AttestError::ReadFailure {
            reason: format!("ledger file lock poisoned: {}", e),
        })
    }
}

impl LedgerStore for JsonlLedgerStore {
    fn tip(&self) -> AttestResult<Option<LedgerBlock>> {
        Ok(self.lock()?.blocks.last().cloned())
    }

    fn append_if_tip(&self, block: LedgerBlock) -> AttestResult<()> {
        let mut state = self.lock()?;
        if !block_extends(state.blocks.last(), &block) {
            return Err(AttestError::WriteConflict {
                chain: LEDGER_CHAIN.to_string(),
            });
        }

        state.file.append(&block)?;
        state.blocks.push(block);
        Ok(())
    }

    fn blocks(&self) -> AttestResult<Vec<LedgerBlock>> {
        Ok(self.lock()?.blocks.clone())
    }
}
