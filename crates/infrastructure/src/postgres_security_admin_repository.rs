use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_application::{
    AccessRequestQuery, DelegationQuery, ReviewTransition, RoleAssignmentQuery,
    SecurityAdminRepository,
};
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{AccessRequest, PermissionDelegation, RoleAssignment};

use crate::postgres_grant_rows::{
    ACCESS_REQUEST_COLUMNS, AccessRequestRow, DELEGATION_COLUMNS, DelegationRow,
    ROLE_ASSIGNMENT_COLUMNS, RoleAssignmentRow, map_unique_violation, page_bounds, scope_columns,
};

mod access_requests;
mod delegations;
mod role_assignments;


/// Advisory lock key that serializes bootstrap attempts.
const BOOTSTRAP_LOCK_KEY: i64 = 0x6761_7465_0001;

/// PostgreSQL-backed repository for assignment, delegation and access request writes.
#[derive(Clone)]
pub struct PostgresSecurityAdminRepository {
    pool: PgPool,
}

impl PostgresSecurityAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecurityAdminRepository for PostgresSecurityAdminRepository {
    async fn insert_role_assignment(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        self.insert_role_assignment_impl(assignment, as_of).await
    }

    async fn insert_bootstrap_assignment(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        self.insert_bootstrap_assignment_impl(assignment, as_of)
            .await
    }

    async fn find_role_assignment(&self, assignment_id: Uuid) -> AppResult<Option<RoleAssignment>> {
        self.find_role_assignment_impl(assignment_id).await
    }

    async fn deactivate_role_assignment(
        &self,
        assignment_id: Uuid,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.deactivate_role_assignment_impl(assignment_id, revoked_by, revoked_at)
            .await
    }

    async fn list_role_assignments(
        &self,
        query: &RoleAssignmentQuery,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.list_role_assignments_impl(query).await
    }

    async fn insert_delegation(&self, delegation: &PermissionDelegation) -> AppResult<()> {
        self.insert_delegation_impl(delegation).await
    }

    async fn find_delegation(
        &self,
        delegation_id: Uuid,
    ) -> AppResult<Option<PermissionDelegation>> {
        self.find_delegation_impl(delegation_id).await
    }

    async fn deactivate_delegation(
        &self,
        delegation_id: Uuid,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.deactivate_delegation_impl(delegation_id, revoked_by, revoked_at)
            .await
    }

    async fn list_delegations(
        &self,
        query: &DelegationQuery,
    ) -> AppResult<Vec<PermissionDelegation>> {
        self.list_delegations_impl(query).await
    }

    async fn insert_access_request(&self, request: &AccessRequest) -> AppResult<()> {
        self.insert_access_request_impl(request).await
    }

    async fn find_access_request(&self, request_id: Uuid) -> AppResult<Option<AccessRequest>> {
        self.find_access_request_impl(request_id).await
    }

    async fn apply_review_transition(
        &self,
        request_id: Uuid,
        transition: &ReviewTransition,
    ) -> AppResult<Option<AccessRequest>> {
        self.apply_review_transition_impl(request_id, transition)
            .await
    }

    async fn list_access_requests(
        &self,
        query: &AccessRequestQuery,
    ) -> AppResult<Vec<AccessRequest>> {
        self.list_access_requests_impl(query).await
    }
}
