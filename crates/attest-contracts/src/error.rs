//! Runtime error types for the attest ledger.
//!
//! All fallible ledger operations return `AttestResult<T>`.  Tampering is not
//! an error: the verifier reports it as an `IntegrityFailure` inside an
//! `IntegrityReport` so it can never be swallowed by a `?`.

use thiserror::Error;

/// The unified error type for the attest crates.
#[derive(Debug, Error)]
pub enum AttestError {
    /// The backing store could not return the chain tip or sequence.
    ///
    /// Appends abort on this error before anything is written.
    #[error("store read failed: {reason}")]
    ReadFailure { reason: String },

    /// The backing store could not persist a record.
    #[error("store write failed: {reason}")]
    WriteFailure { reason: String },

    /// A conditional append lost a race: the chain tip moved between the
    /// read and the write.
    #[error("write conflict on chain '{chain}': tip moved before append")]
    WriteConflict { chain: String },

    /// Every attempt allowed by the `AppendPolicy` hit a write conflict.
    #[error("append to chain '{chain}' abandoned after {attempts} conflicting attempts")]
    AppendRetriesExhausted { chain: String, attempts: u32 },

    /// The mining search was cancelled before it found a valid nonce.
    #[error("mining cancelled before a valid nonce was found")]
    MiningCancelled,

    /// The mining search ran past the configured time budget.
    #[error("mining timed out after {elapsed_ms} ms")]
    MiningTimeout { elapsed_ms: u64 },

    /// The blocking mining worker panicked or could not be joined.
    #[error("mining worker failed: {reason}")]
    MiningWorkerFailed { reason: String },

    /// A record could not be serialized or deserialized.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl AttestError {
    /// True for errors the append caller may resolve by retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AttestError::ReadFailure { .. }
                | AttestError::WriteFailure { .. }
                | AttestError::WriteConflict { .. }
                | AttestError::AppendRetriesExhausted { .. }
                | AttestError::MiningCancelled
                | AttestError::MiningTimeout { .. }
        )
    }
}

/// Convenience alias used throughout the attest crates.
pub type AttestResult<T> = Result<T, AttestError>;
