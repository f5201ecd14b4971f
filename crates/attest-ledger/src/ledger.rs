//! The proof-of-work ledger.
//!
//! `ProofOfWorkLedger::append_block` reads the global tip, builds the next
//! header, mines it on the blocking pool, and conditionally appends the
//! sealed block.  A single async mutex serializes appends made through one
//! ledger for the whole read → mine → write span; the store's conditional
//! append catches writers outside this process, after which the block is
//! re-mined against the fresh tip.
//!
//! `shutdown` cancels every in-flight search.  A cancelled or timed-out
//! search never reaches the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use attest_contracts::{
    block::{BlockQuery, DataType, LedgerBlock},
    error::{AttestError, AttestResult},
    policy::AppendPolicy,
};
use attest_core::{
    hasher::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY},
    traits::{LedgerStore, LEDGER_CHAIN},
};

use crate::{block::BlockHeader, cancel::CancellationToken, miner::MiningTask};

/// A global, append-only, proof-of-work sealed ledger.
pub struct ProofOfWorkLedger<S: LedgerStore> {
    store: Arc<S>,
    difficulty: u32,
    policy: AppendPolicy,
    mining_timeout: Option<Duration>,
    tip_guard: Mutex<()>,
    shutdown: CancellationToken,
}

impl<S: LedgerStore> ProofOfWorkLedger<S> {
    /// A ledger at `DEFAULT_DIFFICULTY` with no mining timeout.
    pub fn new(store: Arc<S>, policy: AppendPolicy) -> Self {
        Self {
            store,
            difficulty: DEFAULT_DIFFICULTY,
            policy,
            mining_timeout: None,
            tip_guard: Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Set the difficulty, capped at `MAX_DIFFICULTY`.  `0` accepts the
    /// first nonce tried.
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty.min(MAX_DIFFICULTY);
        self
    }

    /// Abandon any single mining search that runs longer than `timeout`.
    pub fn with_mining_timeout(mut self, timeout: Duration) -> Self {
        self.mining_timeout = Some(timeout);
        self
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Mine and persist a block carrying `data`, returning its hash.
    ///
    /// # Errors
    ///
    /// - `ReadFailure` if the tip could not be read (nothing written)
    /// - `MiningCancelled` after `shutdown`, `MiningTimeout` past the budget
    /// - `AppendRetriesExhausted` if every allowed attempt lost a race
    /// - any write error reported by the store
    pub async fn append_block(&self, data: Value, data_type: DataType) -> AttestResult<String> {
        if self.shutdown.is_cancelled() {
            return Err(AttestError::MiningCancelled);
        }

        let _tip = self.tip_guard.lock().await;

        for attempt in 1..=self.policy.max_attempts {
            let header = self.next_header(data.clone(), data_type)?;
            let index = header.index;

            let task = MiningTask::spawn(header.preimage(), self.difficulty, &self.shutdown);
            let seal = match task.join(self.mining_timeout).await {
                Ok(seal) => seal,
                Err(e) => {
                    warn!(index, error = %e, "block not mined; nothing persisted");
                    return Err(e);
                }
            };

            let block = header.seal(seal);
            let hash = block.hash.clone();
            let nonce = block.nonce;

            match self.store.append_if_tip(block) {
                Ok(()) => {
                    info!(
                        index,
                        nonce,
                        data_type = %data_type,
                        hash = %hash,
                        "ledger block appended"
                    );
                    return Ok(hash);
                }
                Err(AttestError::WriteConflict { chain }) => {
                    warn!(
                        chain = %chain,
                        index,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "ledger tip moved while mining; re-mining"
                    );
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(AttestError::AppendRetriesExhausted {
            chain: LEDGER_CHAIN.to_string(),
            attempts: self.policy.max_attempts,
        })
    }

    /// Blocks matching `query`, newest first.
    pub fn query(&self, query: &BlockQuery) -> AttestResult<Vec<LedgerBlock>> {
        self.store.query(query)
    }

    pub fn tip(&self) -> AttestResult<Option<LedgerBlock>> {
        self.store.tip()
    }

    /// Number of blocks in the ledger.
    pub fn height(&self) -> AttestResult<u64> {
        Ok(self.store.tip()?.map(|tip| tip.index + 1).unwrap_or(0))
    }

    /// Cancel in-flight mining and refuse new appends.
    pub fn shutdown(&self) {
        info!("ledger shutting down; cancelling mining");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn next_header(&self, data: Value, data_type: DataType) -> AttestResult<BlockHeader> {
        let tip = self.store.tip()?;

        let now = Utc::now().trunc_subsecs(6);
        let header = match tip {
            Some(tip) => BlockHeader {
                index: tip.index + 1,
                timestamp: now.max(tip.timestamp),
                data,
                data_type,
                previous_hash: tip.hash,
            },
            None => BlockHeader {
                index: 0,
                timestamp: now,
                data,
                data_type,
                previous_hash: LedgerBlock::GENESIS_PREVIOUS_HASH.to_string(),
            },
        };

        debug!(
            index = header.index,
            previous_hash = %header.previous_hash,
            difficulty = self.difficulty,
            "mining next block"
        );
        Ok(header)
    }
}
