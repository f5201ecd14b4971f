//! Block preimage encoding.
//!
//! Preimage layout (framed per `attest_core::hasher`, in order):
//!   1. index (8-byte LE)
//!   2. timestamp
//!   3. canonical JSON of data
//!   4. data_type tag
//!   5. previous_hash
//!   6. nonce (8-byte LE), appended by the miner
//!
//! Re-tagging a stored block changes its recomputed hash like any other
//! edit.

use chrono::{DateTime, Utc};
use serde_json::Value;

use attest_contracts::block::{DataType, LedgerBlock};
use attest_core::hasher::Preimage;

use crate::miner::Seal;

fn header_preimage(
    index: u64,
    timestamp: &DateTime<Utc>,
    data: &Value,
    data_type: DataType,
    previous_hash: &str,
) -> Preimage {
    Preimage::new()
        .number(index)
        .timestamp(timestamp)
        .json(data)
        .text(data_type.as_str())
        .text(previous_hash)
}

/// Everything in a block except the mining result.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockHeader {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
    pub data_type: DataType,
    pub previous_hash: String,
}

impl BlockHeader {
    /// The nonce-less preimage the miner searches over.
    pub fn preimage(&self) -> Preimage {
        header_preimage(
            self.index,
            &self.timestamp,
            &self.data,
            self.data_type,
            &self.previous_hash,
        )
    }

    /// Attach a mining result, producing the block to persist.
    pub fn seal(self, seal: Seal) -> LedgerBlock {
        LedgerBlock {
            index: self.index,
            timestamp: self.timestamp,
            data: self.data,
            data_type: self.data_type,
            previous_hash: self.previous_hash,
            hash: seal.hash,
            nonce: seal.nonce,
        }
    }
}

/// Recompute a stored block's hash from its fields, including its nonce.
pub fn hash_block(block: &LedgerBlock) -> String {
    header_preimage(
        block.index,
        &block.timestamp,
        &block.data,
        block.data_type,
        &block.previous_hash,
    )
    .sealed_hex(block.nonce)
}
