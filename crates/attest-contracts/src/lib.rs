//! # attest-contracts
//!
//! Shared record types, integrity reports, and errors for the attest audit
//! ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod block;
pub mod entry;
pub mod error;
pub mod policy;
pub mod report;
