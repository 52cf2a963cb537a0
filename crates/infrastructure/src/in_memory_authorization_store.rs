use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use gatehouse_application::{
    AccessRequestQuery, AuditStreamQuery, AuthorizationRepository, DelegationQuery,
    PermissionAuditRepository, ReviewTransition, RoleAssignmentQuery, SecurityAdminRepository,
};
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{
    AUDIT_GENESIS_HASH, AccessRequest, AccessRequestStatus, GrantSnapshot, PermissionAuditEntry,
    PermissionAuditRecord, PermissionDelegation, Role, RoleAssignment, ScopeChain,
    audit_record_digest,
};


#[derive(Debug, Default)]
struct GrantTables {
    assignments: Vec<RoleAssignment>,
    delegations: Vec<PermissionDelegation>,
    access_requests: Vec<AccessRequest>,
}

/// In-memory implementation of every authorization storage port.
///
/// All grant tables sit behind one lock, so each write is atomic and each
/// snapshot is consistent.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationStore {
    grants: RwLock<GrantTables>,
    audits: RwLock<Vec<PermissionAuditRecord>>,
}

impl InMemoryAuthorizationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T: Clone>(values: impl Iterator<Item = T>, offset: usize, limit: usize) -> Vec<T> {
    values.skip(offset).take(limit).collect()
}

#[async_trait]
impl AuthorizationRepository for InMemoryAuthorizationStore {
    async fn load_grant_snapshot(
        &self,
        principal: &str,
        chain: &ScopeChain,
        as_of: DateTime<Utc>,
    ) -> AppResult<GrantSnapshot> {
        let grants = self.grants.read().await;

        Ok(GrantSnapshot {
            assignments: grants
                .assignments
                .iter()
                .filter(|value| {
                    value.user_id == principal
                        && value.is_effective_at(as_of)
                        && chain.contains(&value.scope)
                })
                .cloned()
                .collect(),
            delegations: grants
                .delegations
                .iter()
                .filter(|value| {
                    value.delegate_id == principal
                        && value.is_effective_at(as_of)
                        && chain.contains(&value.scope)
                })
                .cloned()
                .collect(),
            access_requests: grants
                .access_requests
                .iter()
                .filter(|value| {
                    value.requester_id == principal
                        && value.status == AccessRequestStatus::Approved
                        && value.expires_at > as_of
                        && chain.contains(&value.scope)
                })
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl SecurityAdminRepository for InMemoryAuthorizationStore {
    async fn insert_role_assignment(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut grants = self.grants.write().await;
        let same_tuple = |value: &RoleAssignment| {
            value.is_active && value.user_id == assignment.user_id && value.scope == assignment.scope
        };

        if grants
            .assignments
            .iter()
            .any(|value| same_tuple(value) && value.is_effective_at(as_of))
        {
            return Err(AppError::Conflict(format!(
                "principal '{}' already holds an effective assignment at {}",
                assignment.user_id, assignment.scope
            )));
        }

        for value in grants
            .assignments
            .iter_mut()
            .filter(|value| same_tuple(value))
        {
            value.is_active = false;
            value.revoked_by = Some(assignment.granted_by.clone());
            value.revoked_at = Some(as_of);
        }
        grants.assignments.push(assignment.clone());
        Ok(())
    }

    async fn insert_bootstrap_assignment(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut grants = self.grants.write().await;
        if grants
            .assignments
            .iter()
            .any(|value| value.role == Role::System && value.is_effective_at(as_of))
        {
            return Err(AppError::Conflict(
                "a system principal has already been bootstrapped".to_owned(),
            ));
        }
        if grants.assignments.iter().any(|value| {
            value.is_active && value.user_id == assignment.user_id && value.scope == assignment.scope
        }) {
            return Err(AppError::Conflict(format!(
                "principal '{}' already holds a global assignment",
                assignment.user_id
            )));
        }

        grants.assignments.push(assignment.clone());
        Ok(())
    }

    async fn find_role_assignment(&self, assignment_id: Uuid) -> AppResult<Option<RoleAssignment>> {
        Ok(self
            .grants
            .read()
            .await
            .assignments
            .iter()
            .find(|value| value.assignment_id == assignment_id)
            .cloned())
    }

    async fn deactivate_role_assignment(
        &self,
        assignment_id: Uuid,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut grants = self.grants.write().await;
        if let Some(value) = grants
            .assignments
            .iter_mut()
            .find(|value| value.assignment_id == assignment_id && value.is_active)
        {
            value.is_active = false;
            value.revoked_by = Some(revoked_by.to_owned());
            value.revoked_at = Some(revoked_at);
        }
        Ok(())
    }

    async fn list_role_assignments(
        &self,
        query: &RoleAssignmentQuery,
    ) -> AppResult<Vec<RoleAssignment>> {
        let grants = self.grants.read().await;
        let mut values: Vec<&RoleAssignment> = grants
            .assignments
            .iter()
            .filter(|value| query.user_id.as_deref().is_none_or(|id| value.user_id == id))
            .filter(|value| query.scope.as_ref().is_none_or(|scope| &value.scope == scope))
            .filter(|value| query.effective_at.is_none_or(|at| value.is_effective_at(at)))
            .collect();
        values.sort_by_key(|value| (value.granted_at, value.assignment_id));

        Ok(page(values.into_iter().cloned(), query.offset, query.limit))
    }

    async fn insert_delegation(&self, delegation: &PermissionDelegation) -> AppResult<()> {
        let mut grants = self.grants.write().await;
        if grants
            .delegations
            .iter()
            .any(|value| value.delegation_id == delegation.delegation_id)
        {
            return Err(AppError::Conflict(format!(
                "delegation '{}' already exists",
                delegation.delegation_id
            )));
        }

        grants.delegations.push(delegation.clone());
        Ok(())
    }

    async fn find_delegation(
        &self,
        delegation_id: Uuid,
    ) -> AppResult<Option<PermissionDelegation>> {
        Ok(self
            .grants
            .read()
            .await
            .delegations
            .iter()
            .find(|value| value.delegation_id == delegation_id)
            .cloned())
    }

    async fn deactivate_delegation(
        &self,
        delegation_id: Uuid,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut grants = self.grants.write().await;
        if let Some(value) = grants
            .delegations
            .iter_mut()
            .find(|value| value.delegation_id == delegation_id && value.is_active)
        {
            value.is_active = false;
            value.revoked_by = Some(revoked_by.to_owned());
            value.revoked_at = Some(revoked_at);
        }
        Ok(())
    }

    async fn list_delegations(
        &self,
        query: &DelegationQuery,
    ) -> AppResult<Vec<PermissionDelegation>> {
        let grants = self.grants.read().await;
        let mut values: Vec<&PermissionDelegation> = grants
            .delegations
            .iter()
            .filter(|value| {
                query
                    .delegator_id
                    .as_deref()
                    .is_none_or(|id| value.delegator_id == id)
            })
            .filter(|value| {
                query
                    .delegate_id
                    .as_deref()
                    .is_none_or(|id| value.delegate_id == id)
            })
            .filter(|value| query.scope.as_ref().is_none_or(|scope| &value.scope == scope))
            .filter(|value| query.effective_at.is_none_or(|at| value.is_effective_at(at)))
            .collect();
        values.sort_by_key(|value| (value.granted_at, value.delegation_id));

        Ok(page(values.into_iter().cloned(), query.offset, query.limit))
    }

    async fn insert_access_request(&self, request: &AccessRequest) -> AppResult<()> {
        let mut grants = self.grants.write().await;
        if grants
            .access_requests
            .iter()
            .any(|value| value.request_id == request.request_id)
        {
            return Err(AppError::Conflict(format!(
                "access request '{}' already exists",
                request.request_id
            )));
        }

        grants.access_requests.push(request.clone());
        Ok(())
    }

    async fn find_access_request(&self, request_id: Uuid) -> AppResult<Option<AccessRequest>> {
        Ok(self
            .grants
            .read()
            .await
            .access_requests
            .iter()
            .find(|value| value.request_id == request_id)
            .cloned())
    }

    async fn apply_review_transition(
        &self,
        request_id: Uuid,
        transition: &ReviewTransition,
    ) -> AppResult<Option<AccessRequest>> {
        let mut grants = self.grants.write().await;
        let Some(value) = grants.access_requests.iter_mut().find(|value| {
            value.request_id == request_id
                && value.status == AccessRequestStatus::Pending
                && value.expires_at > transition.reviewed_at
        }) else {
            return Ok(None);
        };

        value.status = transition.status;
        value.reviewed_by = Some(transition.reviewed_by.clone());
        value.reviewed_at = Some(transition.reviewed_at);
        value.review_reason.clone_from(&transition.review_reason);
        Ok(Some(value.clone()))
    }

    async fn list_access_requests(
        &self,
        query: &AccessRequestQuery,
    ) -> AppResult<Vec<AccessRequest>> {
        let grants = self.grants.read().await;
        let mut values: Vec<&AccessRequest> = grants
            .access_requests
            .iter()
            .filter(|value| {
                query
                    .requester_id
                    .as_deref()
                    .is_none_or(|id| value.requester_id == id)
            })
            .filter(|value| query.scope.as_ref().is_none_or(|scope| &value.scope == scope))
            .filter(|value| {
                query
                    .status
                    .is_none_or(|status| value.effective_status(query.as_of) == status)
            })
            .collect();
        values.sort_by_key(|value| (value.requested_at, value.request_id));

        Ok(page(values.into_iter().cloned(), query.offset, query.limit))
    }
}

#[async_trait]
impl PermissionAuditRepository for InMemoryAuthorizationStore {
    async fn append_audit(&self, entry: &PermissionAuditEntry) -> AppResult<bool> {
        let mut audits = self.audits.write().await;
        if audits
            .iter()
            .any(|record| record.entry.audit_id == entry.audit_id)
        {
            return Ok(false);
        }

        let previous_hash = audits
            .last()
            .map(|record| record.record_hash.clone())
            .unwrap_or_else(|| AUDIT_GENESIS_HASH.to_owned());
        let sequence = audits.last().map_or(1, |record| record.sequence + 1);
        let record_hash = audit_record_digest(&previous_hash, entry);

        audits.push(PermissionAuditRecord {
            sequence,
            entry: entry.clone(),
            previous_hash,
            record_hash,
        });
        Ok(true)
    }

    async fn list_audits(&self, query: &AuditStreamQuery) -> AppResult<Vec<PermissionAuditRecord>> {
        Ok(self
            .audits
            .read()
            .await
            .iter()
            .filter(|record| record.sequence > query.after_sequence)
            .filter(|record| {
                query
                    .user_id
                    .as_deref()
                    .is_none_or(|user_id| record.entry.user_id == user_id)
            })
            .filter(|record| {
                query
                    .allowed
                    .is_none_or(|allowed| record.entry.allowed == allowed)
            })
            .take(query.limit)
            .cloned()
            .collect())
    }
}
