//! # attest-verify
//!
//! Read-only integrity verification for both chain structures.
//!
//! The walks in [`walk`] are pure functions of a persisted sequence:
//! [`verify_entries`] for one tenant's audit chain and [`verify_blocks`] for
//! the proof-of-work ledger.  [`IntegrityVerifier`] loads those sequences
//! from storage and logs the outcome.
//!
//! Verification stops at the earliest bad record and reports its position
//! and the kind of damage:
//!
//! - `HashMismatch`: the record's fields no longer produce its stored hash
//! - `ChainBreak`: the record does not link to its actual predecessor
//!
//! ## Usage
//!
//! ```rust,ignore
//! let verifier = IntegrityVerifier::new(audit_store, ledger_store);
//! let report = verifier.verify_chain("t1")?;
//! if !report.ok {
//!     eprintln!("tampering at entry {:?}", report.first_failure_index());
//! }
//! ```

pub mod verifier;
pub mod walk;

pub use verifier::IntegrityVerifier;
pub use walk::{verify_blocks, verify_entries};

// ── Tests ─────────────────────────────────────────────────────────────────────
