use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{
    AccessRequest, AccessRequestStatus, Action, PermissionDelegation, ResourceKind, Role,
    RoleAssignment, Scope, ScopeType,
};

pub(crate) const ROLE_ASSIGNMENT_COLUMNS: &str = r#"
    assignment_id,
    user_id,
    role,
    scope_type,
    scope_id,
    granted_by,
    granted_at,
    expires_at,
    is_active,
    revoked_by,
    revoked_at
"#;

pub(crate) const DELEGATION_COLUMNS: &str = r#"
    delegation_id,
    delegator_id,
    delegate_id,
    resource,
    actions,
    resource_id,
    scope_type,
    scope_id,
    granted_at,
    expires_at,
    is_active,
    reason,
    revoked_by,
    revoked_at
"#;

pub(crate) const ACCESS_REQUEST_COLUMNS: &str = r#"
    request_id,
    requester_id,
    resource,
    action,
    resource_id,
    scope_type,
    scope_id,
    justification,
    requested_at,
    status,
    reviewed_by,
    reviewed_at,
    review_reason,
    expires_at
"#;

#[derive(Debug, FromRow)]
pub(crate) struct RoleAssignmentRow {
    assignment_id: Uuid,
    user_id: String,
    role: String,
    scope_type: String,
    scope_id: Option<String>,
    granted_by: String,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    revoked_by: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
}

impl RoleAssignmentRow {
    pub(crate) fn into_assignment(self) -> AppResult<RoleAssignment> {
        Ok(RoleAssignment {
            assignment_id: self.assignment_id,
            user_id: self.user_id,
            role: decode(Role::from_str(&self.role), "role", &self.role)?,
            scope: decode_scope(&self.scope_type, self.scope_id.as_deref())?,
            granted_by: self.granted_by,
            granted_at: self.granted_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
            revoked_by: self.revoked_by,
            revoked_at: self.revoked_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct DelegationRow {
    delegation_id: Uuid,
    delegator_id: String,
    delegate_id: String,
    resource: String,
    actions: Vec<String>,
    resource_id: Option<String>,
    scope_type: String,
    scope_id: Option<String>,
    granted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_active: bool,
    reason: String,
    revoked_by: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
}

impl DelegationRow {
    pub(crate) fn into_delegation(self) -> AppResult<PermissionDelegation> {
        let actions = self
            .actions
            .iter()
            .map(|action| decode(Action::from_str(action), "action", action))
            .collect::<AppResult<BTreeSet<_>>>()?;

        Ok(PermissionDelegation {
            delegation_id: self.delegation_id,
            delegator_id: self.delegator_id,
            delegate_id: self.delegate_id,
            resource: decode(
                ResourceKind::from_str(&self.resource),
                "resource",
                &self.resource,
            )?,
            actions,
            resource_id: self.resource_id,
            scope: decode_scope(&self.scope_type, self.scope_id.as_deref())?,
            granted_at: self.granted_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
            reason: self.reason,
            revoked_by: self.revoked_by,
            revoked_at: self.revoked_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AccessRequestRow {
    request_id: Uuid,
    requester_id: String,
    resource: String,
    action: String,
    resource_id: Option<String>,
    scope_type: String,
    scope_id: Option<String>,
    justification: String,
    requested_at: DateTime<Utc>,
    status: String,
    reviewed_by: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    review_reason: Option<String>,
    expires_at: DateTime<Utc>,
}

impl AccessRequestRow {
    pub(crate) fn into_access_request(self) -> AppResult<AccessRequest> {
        Ok(AccessRequest {
            request_id: self.request_id,
            requester_id: self.requester_id,
            resource: decode(
                ResourceKind::from_str(&self.resource),
                "resource",
                &self.resource,
            )?,
            action: decode(Action::from_str(&self.action), "action", &self.action)?,
            resource_id: self.resource_id,
            scope: decode_scope(&self.scope_type, self.scope_id.as_deref())?,
            justification: self.justification,
            requested_at: self.requested_at,
            status: decode(
                AccessRequestStatus::from_str(&self.status),
                "status",
                &self.status,
            )?,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at,
            review_reason: self.review_reason,
            expires_at: self.expires_at,
        })
    }
}

/// Splits a scope into the `(scope_type, scope_id)` column pair.
pub(crate) fn scope_columns(scope: &Scope) -> (&'static str, Option<&str>) {
    (scope.scope_type().as_str(), scope.scope_id())
}

fn decode_scope(scope_type: &str, scope_id: Option<&str>) -> AppResult<Scope> {
    let scope_type = decode(ScopeType::from_str(scope_type), "scope type", scope_type)?;
    decode(
        Scope::from_parts(scope_type, scope_id),
        "scope",
        scope_id.unwrap_or_default(),
    )
}

fn decode<T>(value: AppResult<T>, column: &str, raw: &str) -> AppResult<T> {
    value.map_err(|error| {
        AppError::Internal(format!("failed to decode stored {column} '{raw}': {error}"))
    })
}

pub(crate) fn map_unique_violation(error: sqlx::Error, message: String) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(message);
    }

    AppError::Internal(format!("failed to persist row: {error}"))
}

pub(crate) fn page_bounds(limit: usize, offset: usize) -> (i64, i64) {
    (
        i64::try_from(limit).unwrap_or(i64::MAX),
        i64::try_from(offset).unwrap_or(i64::MAX),
    )
}
