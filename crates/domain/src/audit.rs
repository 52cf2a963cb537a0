use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use gatehouse_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Action, AuditId, ResourceKind, ScopeType};

/// Hash that anchors the first record of an audit chain.
pub const AUDIT_GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// One permission decision awaiting durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionAuditEntry {
    /// Deduplication key of the record.
    pub audit_id: AuditId,
    /// Correlation id of the inbound request.
    pub request_id: Uuid,
    /// Evaluated principal.
    pub user_id: String,
    /// Evaluated action.
    pub action: Action,
    /// Evaluated resource kind.
    pub resource: ResourceKind,
    /// Evaluated resource id.
    pub resource_id: Option<String>,
    /// Scope type the decision was made at.
    pub scope_type: ScopeType,
    /// Scope id as supplied, which may be malformed.
    pub scope_id: Option<String>,
    /// Decision outcome.
    pub allowed: bool,
    /// Decision timestamp, truncated to microseconds.
    pub timestamp: DateTime<Utc>,
    /// Request metadata and decision annotations.
    pub request_metadata: Value,
}

impl PermissionAuditEntry {
    /// Builds an entry, truncating the timestamp to storage precision.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        audit_id: AuditId,
        request_id: Uuid,
        user_id: impl Into<String>,
        action: Action,
        resource: ResourceKind,
        resource_id: Option<String>,
        scope_type: ScopeType,
        scope_id: Option<String>,
        allowed: bool,
        timestamp: DateTime<Utc>,
        request_metadata: Value,
    ) -> Self {
        Self {
            audit_id,
            request_id,
            user_id: storable_text(user_id.into()),
            action,
            resource,
            resource_id: resource_id.map(storable_text),
            scope_type,
            scope_id: scope_id.map(storable_text),
            allowed,
            timestamp: timestamp.trunc_subsecs(6),
            request_metadata: storable_json(request_metadata),
        }
    }

    fn canonical_json(&self) -> String {
        json!({
            "audit_id": self.audit_id.as_uuid().to_string(),
            "request_id": self.request_id.to_string(),
            "user_id": self.user_id,
            "action": self.action.as_str(),
            "resource": self.resource.as_str(),
            "resource_id": self.resource_id,
            "scope_type": self.scope_type.as_str(),
            "scope_id": self.scope_id,
            "allowed": self.allowed,
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            "request_metadata": self.request_metadata,
        })
        .to_string()
    }
}

/// A durably stored audit record linked into the hash chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionAuditRecord {
    /// Monotonic store sequence.
    pub sequence: i64,
    /// Stored entry.
    pub entry: PermissionAuditEntry,
    /// Hash of the preceding record.
    pub previous_hash: String,
    /// Hash of this record.
    pub record_hash: String,
}

/// Summary of a successful chain verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditChainVerification {
    /// Number of records checked.
    pub records: usize,
    /// Hash of the last record checked, or the anchor when none were.
    pub head_hash: String,
}

/// Computes the chained hash of an entry.
#[must_use]
pub fn audit_record_digest(previous_hash: &str, entry: &PermissionAuditEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(entry.canonical_json().as_bytes());
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

/// Verifies that records form an unbroken chain starting from `anchor`.
pub fn verify_audit_chain(
    records: &[PermissionAuditRecord],
    anchor: &str,
) -> AppResult<AuditChainVerification> {
    let mut expected_previous = anchor.to_owned();
    let mut last_sequence = None;

    for record in records {
        if last_sequence.is_some_and(|last| record.sequence <= last) {
            return Err(AppError::Validation(format!(
                "audit sequence {} is out of order",
                record.sequence
            )));
        }
        if record.previous_hash != expected_previous {
            return Err(AppError::Validation(format!(
                "audit chain broken at sequence {}: previous hash mismatch",
                record.sequence
            )));
        }
        if audit_record_digest(&record.previous_hash, &record.entry) != record.record_hash {
            return Err(AppError::Validation(format!(
                "audit record {} does not match its hash",
                record.sequence
            )));
        }

        last_sequence = Some(record.sequence);
        expected_previous.clone_from(&record.record_hash);
    }

    Ok(AuditChainVerification {
        records: records.len(),
        head_hash: expected_previous,
    })
}

/// Replaces NUL characters, which durable text columns cannot hold.
fn storable_text(value: String) -> String {
    if value.contains('\0') {
        value.replace('\0', "\u{FFFD}")
    } else {
        value
    }
}

fn storable_json(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(storable_text(text)),
        Value::Array(items) => Value::Array(items.into_iter().map(storable_json).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, field)| (storable_text(key), storable_json(field)))
                .collect(),
        ),
        other => other,
    }
}
