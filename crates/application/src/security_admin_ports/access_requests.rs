use chrono::{DateTime, Utc};
use gatehouse_domain::{
    AccessRequestStatus, Action, EffectiveAccessRequestStatus, ResourceKind, ReviewDecision,
    Scope, ScopeType,
};

/// Input payload for requesting access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAccessRequestInput {
    /// Requested resource kind.
    pub resource: ResourceKind,
    /// Requested action.
    pub action: Action,
    /// Requested resource id, or the whole kind when absent.
    pub resource_id: Option<String>,
    /// Target scope type.
    pub scope_type: ScopeType,
    /// Target scope id, absent only for the global scope.
    pub scope_id: Option<String>,
    /// Requester justification.
    pub justification: String,
    /// Optional expiry; defaults to the configured request lifetime.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Input payload for reviewing a pending access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAccessRequestInput {
    /// Reviewer verdict.
    pub decision: ReviewDecision,
    /// Optional reviewer note.
    pub reason: Option<String>,
}

/// Conditional state transition applied to a pending access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewTransition {
    /// Terminal status to move to.
    pub status: AccessRequestStatus,
    /// Reviewing principal.
    pub reviewed_by: String,
    /// Review timestamp; the request must still be unexpired at this instant.
    pub reviewed_at: DateTime<Utc>,
    /// Optional reviewer note.
    pub review_reason: Option<String>,
}

/// Query parameters for access request listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequestQuery {
    /// Optional requester filter.
    pub requester_id: Option<String>,
    /// Optional exact scope filter.
    pub scope: Option<Scope>,
    /// Optional effective status filter, evaluated at `as_of`.
    pub status: Option<EffectiveAccessRequestStatus>,
    /// Instant the effective status is evaluated at.
    pub as_of: DateTime<Utc>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}
