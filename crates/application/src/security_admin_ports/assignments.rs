use chrono::{DateTime, Utc};
use gatehouse_domain::{Role, Scope, ScopeType};

/// Input payload for granting a role at a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleAssignmentInput {
    /// Principal receiving the role.
    pub user_id: String,
    /// Granted role.
    pub role: Role,
    /// Target scope type.
    pub scope_type: ScopeType,
    /// Target scope id, absent only for the global scope.
    pub scope_id: Option<String>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Query parameters for role assignment listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentQuery {
    /// Optional principal filter.
    pub user_id: Option<String>,
    /// Optional exact scope filter.
    pub scope: Option<Scope>,
    /// When set, only assignments effective at this instant are returned.
    pub effective_at: Option<DateTime<Utc>>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}
