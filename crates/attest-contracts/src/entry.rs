//! Sequential audit log record types.
//!
//! `NewAuditEntry` is what a business collaborator hands to the log.
//! `AuditEntry` is the persisted, hash-chained row.  `ChainLink` is the pair
//! of digests returned to the caller after a successful append.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One persisted row of a tenant's audit chain.
///
/// Field names match the audit table columns.  Rows are written once and
/// never updated; any change to any field breaks `hash` and therefore the
/// `prev_hash` of every later entry for the same tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Chain scope.  Each tenant has an independent chain.
    pub tenant_id: String,

    /// The acting principal, when known.
    pub actor_id: Option<String>,

    /// Short operation name, e.g. `"create"`.
    pub action: String,

    /// Resource type affected, e.g. `"invoice"`.
    pub entity: Option<String>,

    /// Resource identifier affected.
    pub entity_id: Option<String>,

    /// Structured description of the change.  `{}` when the caller had none.
    pub diff: Value,

    /// Hash of the previous entry for this tenant, or `""` for the first.
    pub prev_hash: String,

    /// SHA-256 (hex) over this entry's canonical preimage.
    pub hash: String,

    /// Fixed before hashing; part of the preimage.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// `prev_hash` value carried by the first entry of every tenant chain.
    pub const GENESIS_PREV_HASH: &'static str = "";
}

/// An audit event as emitted by a business collaborator, before chaining.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub tenant_id: String,
    pub actor_id: Option<String>,
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub diff: Value,
}

impl NewAuditEntry {
    /// Start an event for `tenant_id` recording `action`, with an empty diff.
    pub fn new(tenant_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            actor_id: None,
            action: action.into(),
            entity: None,
            entity_id: None,
            diff: Value::Object(Default::default()),
        }
    }

    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn diff(mut self, diff: Value) -> Self {
        self.diff = diff;
        self
    }
}

/// The digests of a freshly appended entry, returned for corroboration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub prev_hash: String,
    pub hash: String,
}
