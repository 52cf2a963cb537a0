use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use gatehouse_domain::{Action, ResourceKind, Scope, ScopeType};

/// Input payload for delegating actions to another principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDelegationInput {
    /// Principal receiving the actions.
    pub delegate_id: String,
    /// Delegated resource kind.
    pub resource: ResourceKind,
    /// Delegated actions.
    pub actions: BTreeSet<Action>,
    /// Specific resource id, or every resource of the kind when absent.
    pub resource_id: Option<String>,
    /// Target scope type.
    pub scope_type: ScopeType,
    /// Target scope id, absent only for the global scope.
    pub scope_id: Option<String>,
    /// Mandatory expiry.
    pub expires_at: DateTime<Utc>,
    /// Justification recorded with the delegation.
    pub reason: String,
}

/// Query parameters for delegation listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationQuery {
    /// Optional delegator filter.
    pub delegator_id: Option<String>,
    /// Optional delegate filter.
    pub delegate_id: Option<String>,
    /// Optional exact scope filter.
    pub scope: Option<Scope>,
    /// When set, only delegations effective at this instant are returned.
    pub effective_at: Option<DateTime<Utc>>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}
