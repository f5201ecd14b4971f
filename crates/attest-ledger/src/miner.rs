//! The proof-of-work search and its background task.
//!
//! `search_nonce` is a plain linear scan from nonce 0: the first nonce whose
//! digest has `difficulty` leading zero hex digits wins, so every smaller
//! nonce is known to fail.  Expected work grows as `16^difficulty`.
//!
//! `MiningTask` runs that scan on tokio's blocking pool so it never occupies
//! an async worker, and hands the result back through its join future.  The
//! scan polls a `CancellationToken` every `CANCEL_CHECK_INTERVAL` nonces.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use attest_contracts::error::{AttestError, AttestResult};
use attest_core::hasher::{meets_difficulty, Preimage};

use crate::cancel::CancellationToken;

/// Nonces hashed between cancellation checks.
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// A successful mining result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seal {
    pub nonce: u64,
    pub hash: String,
}

/// Find the smallest nonce whose sealed digest meets `difficulty`.
///
/// Returns `None` if `token` is cancelled first (or, in theory, if the nonce
/// space runs out).
pub fn search_nonce(preimage: &Preimage, difficulty: u32, token: &CancellationToken) -> Option<Seal> {
    let hasher = preimage.nonce_hasher();
    let mut nonce: u64 = 0;

    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && token.is_cancelled() {
            return None;
        }

        let digest = hasher.digest(nonce);
        if meets_difficulty(&digest, difficulty) {
            return Some(Seal {
                nonce,
                hash: hex::encode(digest),
            });
        }

        nonce = nonce.checked_add(1)?;
    }
}

/// A nonce search running on the blocking pool.
pub struct MiningTask {
    token: CancellationToken,
    handle: JoinHandle<Option<Seal>>,
    started: Instant,
}

impl MiningTask {
    /// Start searching.  The task stops early when `parent` or the task's
    /// own token is cancelled.
    pub fn spawn(preimage: Preimage, difficulty: u32, parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let worker_token = token.clone();

        debug!(difficulty, "mining task started");
        let handle = tokio::task::spawn_blocking(move || {
            search_nonce(&preimage, difficulty, &worker_token)
        });

        Self {
            token,
            handle,
            started: Instant::now(),
        }
    }

    /// Ask the search to stop.  `join` then returns `MiningCancelled`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait for the search, giving up after `timeout` if one is set.
    ///
    /// The search is cancelled on every exit path: success, timeout, or the
    /// returned future being dropped.
    pub async fn join(self, timeout: Option<Duration>) -> AttestResult<Seal> {
        let MiningTask {
            token,
            handle,
            started,
        } = self;
        let _cancel_on_exit = token.drop_guard();

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    warn!(elapsed_ms, "mining timed out");
                    return Err(AttestError::MiningTimeout { elapsed_ms });
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Some(seal)) => {
                debug!(
                    nonce = seal.nonce,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "mining task finished"
                );
                Ok(seal)
            }
            Ok(None) => Err(AttestError::MiningCancelled),
            Err(e) => Err(AttestError::MiningWorkerFailed {
                reason: e.to_string(),
            }),
        }
    }
}
