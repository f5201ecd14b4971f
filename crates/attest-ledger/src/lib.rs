//! # attest-ledger
//!
//! A global, append-only block ledger where every block is sealed by a
//! proof-of-work search.
//!
//! ## Overview
//!
//! Each block commits to its predecessor's hash and carries a nonce whose
//! digest has a configurable number of leading zero hex digits.  Rewriting
//! history therefore means re-mining every later block, a cost that grows
//! with both the difficulty and the chain length.
//!
//! Mining never runs on an async worker: `MiningTask` moves the search to
//! the blocking pool and can be cancelled at any time without leaving a
//! partial block behind.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use attest_ledger::{InMemoryLedgerStore, ProofOfWorkLedger};
//!
//! let ledger = ProofOfWorkLedger::new(Arc::new(InMemoryLedgerStore::new()), policy)
//!     .with_difficulty(4);
//! let hash = ledger.append_block(json!({ "user": "u1" }), DataType::SecurityEvent).await?;
//! ```

pub mod block;
pub mod cancel;
pub mod file;
pub mod ledger;
pub mod memory;
pub mod miner;

pub use attest_core::hasher::DEFAULT_DIFFICULTY;
pub use block::{hash_block, BlockHeader};
pub use cancel::CancellationToken;
pub use file::JsonlLedgerStore;
pub use ledger::ProofOfWorkLedger;
pub use memory::InMemoryLedgerStore;
pub use miner::{search_nonce, MiningTask, Seal};

// ── Tests ─────────────────────────────────────────────────────────────────────
