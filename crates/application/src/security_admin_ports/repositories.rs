use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use gatehouse_core::AppResult;
use gatehouse_domain::{AccessRequest, PermissionDelegation, RoleAssignment};

use super::access_requests::{AccessRequestQuery, ReviewTransition};
use super::assignments::RoleAssignmentQuery;
use super::delegations::DelegationQuery;

/// Repository port for assignment, delegation and access request writes.
#[async_trait]
pub trait SecurityAdminRepository: Send + Sync {
    /// Inserts an assignment, deactivating lapsed rows for the same tuple first.
    ///
    /// Fails with `Conflict` when an assignment effective at `as_of` already
    /// exists for the same `(user_id, scope)` tuple.
    async fn insert_role_assignment(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Inserts the first global SYSTEM assignment.
    ///
    /// Fails with `Conflict` when any SYSTEM assignment effective at `as_of` exists.
    async fn insert_bootstrap_assignment(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Finds one assignment by id.
    async fn find_role_assignment(&self, assignment_id: Uuid) -> AppResult<Option<RoleAssignment>>;

    /// Soft-deletes an assignment; a no-op when it is already inactive.
    async fn deactivate_role_assignment(
        &self,
        assignment_id: Uuid,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Lists assignments ordered by grant time.
    async fn list_role_assignments(
        &self,
        query: &RoleAssignmentQuery,
    ) -> AppResult<Vec<RoleAssignment>>;

    /// Inserts a delegation.
    async fn insert_delegation(&self, delegation: &PermissionDelegation) -> AppResult<()>;

    /// Finds one delegation by id.
    async fn find_delegation(&self, delegation_id: Uuid)
    -> AppResult<Option<PermissionDelegation>>;

    /// Deactivates a delegation; a no-op when it is already inactive.
    async fn deactivate_delegation(
        &self,
        delegation_id: Uuid,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Lists delegations ordered by grant time.
    async fn list_delegations(&self, query: &DelegationQuery)
    -> AppResult<Vec<PermissionDelegation>>;

    /// Inserts a pending access request.
    async fn insert_access_request(&self, request: &AccessRequest) -> AppResult<()>;

    /// Finds one access request by id.
    async fn find_access_request(&self, request_id: Uuid) -> AppResult<Option<AccessRequest>>;

    /// Applies a review only while the request is pending and unexpired.
    ///
    /// Returns `None` when the condition did not hold, so at most one of any
    /// number of concurrent reviewers observes `Some`.
    async fn apply_review_transition(
        &self,
        request_id: Uuid,
        transition: &ReviewTransition,
    ) -> AppResult<Option<AccessRequest>>;

    /// Lists access requests ordered by submission time.
    async fn list_access_requests(
        &self,
        query: &AccessRequestQuery,
    ) -> AppResult<Vec<AccessRequest>>;
}
