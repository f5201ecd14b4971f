//! # attest-core
//!
//! The leaf layer of the attest audit ledger.
//!
//! This crate provides:
//! - `hasher`: SHA-256 digests, canonical JSON, framed preimages, and the
//!   difficulty predicate shared by both chains
//! - `traits`: the `AuditStore` / `LedgerStore` contracts, including the
//!   atomic conditional append every store must honour
//! - `jsonl`: the append-only file used by the durable stores
//!
//! ## Usage
//!
//! ```rust,ignore
//! use attest_core::hasher::Preimage;
//!
//! let hash = Preimage::new().text("").text("create").json(&diff).digest_hex();
//! ```

pub mod hasher;
pub mod jsonl;
pub mod traits;

// ── Tests ─────────────────────────────────────────────────────────────────────
