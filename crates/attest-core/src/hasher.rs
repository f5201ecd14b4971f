//! Hashing primitives shared by both chains.
//!
//! Every digest in the workspace is SHA-256 over a `Preimage`: an ordered,
//! length-framed byte sequence built from a record's fields.  Framing keeps
//! adjacent fields from being re-split into the same bytes, so
//! `("ab", "c")` and `("a", "bc")` never collide.
//!
//! Field encodings, in the order a caller adds them:
//!   - text: `u64` little-endian byte length, then the UTF-8 bytes
//!   - optional text: `0u8` when absent, otherwise `1u8` then the text frame
//!   - number: 8-byte little-endian
//!   - timestamp: text frame of RFC 3339, UTC, nanoseconds, `Z` suffix
//!   - JSON: one kind byte (see `json_kind`), then the text frame of
//!     `canonical(value)`
//!
//! The kind byte keeps `{}` and `"{}"`, or `1` and `"1"`, apart: their
//! canonical texts are identical.
//!
//! The audit log hashes its preimage directly.  The block ledger appends an
//! 8-byte nonce and searches for one whose digest meets the difficulty.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Leading zero hex digits required when none is configured.
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Largest meaningful difficulty: every nibble of the digest is zero.
pub const MAX_DIFFICULTY: u32 = 64;

/// SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(digest(bytes))
}

/// Deterministic text form of a JSON value for hashing.
///
/// Objects and arrays serialize as compact JSON with object keys sorted at
/// every depth, so construction order never changes the digest.  Scalars
/// hash as their plain text: a string contributes its contents without
/// quotes, numbers, booleans, and `null` their JSON spelling.
pub fn canonical(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => {
            let mut out = String::new();
            write_sorted_json(value, &mut out);
            out
        }
    }
}

fn write_sorted_json(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Value's Display quotes and escapes exactly like serde_json.
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_sorted_json(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_sorted_json(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// The text a timestamp contributes to a preimage.
///
/// Always nine fractional digits, so every nanosecond a stored row can carry
/// is committed.
pub fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// One-byte tag for the JSON type of `value`.
pub fn json_kind(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Number of leading zero hex characters in `digest`.
pub fn leading_hex_zeros(digest: &[u8; 32]) -> u32 {
    let mut zeros = 0;
    for byte in digest {
        if *byte == 0 {
            zeros += 2;
            continue;
        }
        if byte >> 4 == 0 {
            zeros += 1;
        }
        break;
    }
    zeros
}

/// True when `digest` starts with at least `difficulty` zero hex characters.
pub fn meets_difficulty(digest: &[u8; 32], difficulty: u32) -> bool {
    leading_hex_zeros(digest) >= difficulty
}

/// Same predicate over an already hex-encoded digest.
pub fn hex_meets_difficulty(hash: &str, difficulty: u32) -> bool {
    hash.bytes().take_while(|b| *b == b'0').count() >= difficulty as usize
}

/// Ordered, framed hash input for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preimage {
    bytes: Vec<u8>,
}

impl Preimage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, value: &str) -> Self {
        self.bytes.extend_from_slice(&(value.len() as u64).to_le_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
        self
    }

    pub fn optional_text(mut self, value: Option<&str>) -> Self {
        match value {
            None => {
                self.bytes.push(0);
                self
            }
            Some(v) => {
                self.bytes.push(1);
                self.text(v)
            }
        }
    }

    pub fn number(mut self, value: u64) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn timestamp(self, ts: &DateTime<Utc>) -> Self {
        self.text(&timestamp_text(ts))
    }

    pub fn json(mut self, value: &Value) -> Self {
        self.bytes.push(json_kind(value));
        self.text(&canonical(value))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex digest of the preimage alone (the audit log's chain hash).
    pub fn digest_hex(&self) -> String {
        digest_hex(&self.bytes)
    }

    /// A hasher primed with this preimage, for nonce searches.
    pub fn nonce_hasher(&self) -> NonceHasher {
        NonceHasher {
            prefix: Sha256::new_with_prefix(&self.bytes),
        }
    }

    /// Hex digest of the preimage followed by `nonce`.
    pub fn sealed_hex(&self, nonce: u64) -> String {
        hex::encode(self.nonce_hasher().digest(nonce))
    }
}

/// SHA-256 state that already absorbed a preimage; each call only hashes
/// the trailing nonce.
#[derive(Clone)]
pub struct NonceHasher {
    prefix: Sha256,
}

impl NonceHasher {
    pub fn digest(&self, nonce: u64) -> [u8; 32] {
        self.prefix
            .clone()
            .chain_update(nonce.to_le_bytes())
            .finalize()
            .into()
    }
}
