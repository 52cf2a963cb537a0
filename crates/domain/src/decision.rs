use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Role, Scope};

/// Identifier of one permission audit record.
///
/// Generated once per evaluation and used as the deduplication key when a
/// queued record is replayed into the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditId(Uuid);

impl AuditId {
    /// Creates a random audit id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an audit id from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AuditId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Caller-supplied context attached to every audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Correlation id of the inbound request.
    pub request_id: Uuid,
    /// Free-form request metadata such as client address or route.
    pub metadata: Value,
}

impl RequestContext {
    /// Creates a context with a fresh correlation id and no metadata.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            metadata: Value::Object(serde_json::Map::new()),
        }
    }

    /// Returns a copy with one metadata field set.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        if !self.metadata.is_object() {
            self.metadata = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = &mut self.metadata {
            map.insert(key.to_owned(), value.into());
        }
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The grant that allowed an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantRef {
    /// A role assignment in the scope chain.
    Assignment {
        /// Matched assignment id.
        assignment_id: Uuid,
        /// Role carried by the assignment.
        role: Role,
        /// Scope of the assignment.
        scope: Scope,
    },
    /// A delegation covering the action.
    Delegation {
        /// Matched delegation id.
        delegation_id: Uuid,
        /// Principal that delegated the action.
        delegator_id: String,
        /// Scope of the delegation.
        scope: Scope,
    },
    /// An approved access request for the tuple.
    AccessRequest {
        /// Matched request id.
        request_id: Uuid,
        /// Scope of the request.
        scope: Scope,
    },
}

impl GrantRef {
    /// Returns the scope the grant applies to.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        match self {
            Self::Assignment { scope, .. }
            | Self::Delegation { scope, .. }
            | Self::AccessRequest { scope, .. } => scope,
        }
    }

    /// Returns a stable label for the grant kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Assignment { .. } => "assignment",
            Self::Delegation { .. } => "delegation",
            Self::AccessRequest { .. } => "access_request",
        }
    }
}

/// Internal fault that forced a deny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fault", content = "detail", rename_all = "snake_case")]
pub enum EvaluationFault {
    /// The scope input was malformed.
    MalformedScope(String),
    /// Resource metadata could not be resolved.
    MetadataUnavailable(String),
    /// The evaluation exceeded its deadline.
    Timeout,
    /// The grant store could not be read.
    Storage(String),
    /// The resource id cannot name a stored resource.
    InvalidResource(String),
}

impl EvaluationFault {
    /// Returns a stable, detail-free code for the fault.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedScope(_) => "malformed_scope",
            Self::MetadataUnavailable(_) => "metadata_unavailable",
            Self::Timeout => "timeout",
            Self::Storage(_) => "storage",
            Self::InvalidResource(_) => "invalid_resource",
        }
    }
}

/// Outcome of one permission evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the action is allowed.
    pub allowed: bool,
    /// Grant that allowed the action, if any.
    pub matched_via: Option<GrantRef>,
    /// Most specific scope considered.
    pub evaluated_scope: Scope,
    /// Fault that forced the deny, if any.
    pub fault: Option<EvaluationFault>,
    /// Audit record emitted for this evaluation.
    pub audit_id: AuditId,
}

impl Decision {
    /// Builds an allow decision from a matched grant.
    #[must_use]
    pub fn granted(grant: GrantRef, evaluated_scope: Scope, audit_id: AuditId) -> Self {
        Self {
            allowed: true,
            matched_via: Some(grant),
            evaluated_scope,
            fault: None,
            audit_id,
        }
    }

    /// Builds a fail-closed deny decision.
    #[must_use]
    pub fn denied(evaluated_scope: Scope, audit_id: AuditId) -> Self {
        Self {
            allowed: false,
            matched_via: None,
            evaluated_scope,
            fault: None,
            audit_id,
        }
    }

    /// Builds a deny decision caused by an internal fault.
    #[must_use]
    pub fn faulted(fault: EvaluationFault, evaluated_scope: Scope, audit_id: AuditId) -> Self {
        Self {
            allowed: false,
            matched_via: None,
            evaluated_scope,
            fault: Some(fault),
            audit_id,
        }
    }
}
