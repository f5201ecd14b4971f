//! Proof-of-work ledger record types.
//!
//! The ledger is a single global chain of `LedgerBlock`s ordered by `index`.
//! Unlike the per-tenant audit log, every block must also carry a `nonce`
//! whose digest satisfies the ledger's difficulty.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The category tag stored alongside each block's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    AuditLog,
    SecurityEvent,
    PermissionChange,
}

impl DataType {
    /// The wire/storage spelling of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::AuditLog => "audit_log",
            DataType::SecurityEvent => "security_event",
            DataType::PermissionChange => "permission_change",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audit_log" => Ok(DataType::AuditLog),
            "security_event" => Ok(DataType::SecurityEvent),
            "permission_change" => Ok(DataType::PermissionChange),
            other => Err(format!(
                "unknown data type '{other}' (expected audit_log, security_event or permission_change)"
            )),
        }
    }
}

/// One mined block of the global ledger.
///
/// Serialized field names match the ledger table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerBlock {
    /// Zero-based position; gapless and strictly increasing.
    #[serde(rename = "block_index")]
    pub index: u64,

    /// Creation time; part of the preimage.
    #[serde(rename = "block_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Arbitrary payload.
    #[serde(rename = "block_data")]
    pub data: Value,

    pub data_type: DataType,

    /// Hash of block `index - 1`, or `GENESIS_PREVIOUS_HASH` for block 0.
    pub previous_hash: String,

    /// SHA-256 (hex) over the block preimage including `nonce`.
    #[serde(rename = "block_hash")]
    pub hash: String,

    /// The value found by the mining search.
    pub nonce: u64,
}

impl LedgerBlock {
    /// `previous_hash` sentinel for the genesis block.
    pub const GENESIS_PREVIOUS_HASH: &'static str = "0";
}

/// Filter for `query`.  Time bounds are inclusive; results come back newest
/// first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockQuery {
    pub data_type: Option<DataType>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl BlockQuery {
    pub fn of_type(data_type: DataType) -> Self {
        Self {
            data_type: Some(data_type),
            ..Self::default()
        }
    }

    /// True when `block` passes the tag and time filters (limit is applied
    /// by the caller after ordering).
    pub fn matches(&self, block: &LedgerBlock) -> bool {
        if let Some(data_type) = self.data_type {
            if block.data_type != data_type {
                return false;
            }
        }
        if let Some(start) = self.start {
            if block.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if block.timestamp > end {
                return false;
            }
        }
        true
    }
}
