//! Hand-written port fakes shared by service tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{
    AUDIT_GENESIS_HASH, AccessRequest, AccessRequestStatus, GrantSnapshot, PermissionAuditEntry,
    PermissionAuditRecord, PermissionDelegation, ResourceKind, Role, RoleAssignment, Scope,
    ScopeChain, audit_record_digest,
};

use crate::{
    AccessRequestQuery, AuditLogger, AuditStreamQuery, AuthorizationConfig,
    AuthorizationRepository, AuthorizationService, Clock, DelegationQuery,
    PermissionAuditRepository, ResourceMetadataProvider, ResourceOwnership, ReviewTransition,
    RoleAssignmentQuery, ScopeResolver, SecurityAdminRepository, SecurityAdminService,
};

pub(crate) struct Harness {
    pub(crate) authorization: AuthorizationService,
    pub(crate) admin: SecurityAdminService,
    pub(crate) grants: Arc<FakeGrantStore>,
    pub(crate) audits: Arc<FakeAuditRepository>,
    pub(crate) clock: Arc<ManualClock>,
}

pub(crate) fn harness(provider: FakeMetadataProvider) -> Harness {
    harness_with(provider, AuthorizationConfig::default())
}

pub(crate) fn harness_with(provider: FakeMetadataProvider, config: AuthorizationConfig) -> Harness {
    let grants = Arc::new(FakeGrantStore::default());
    let audits = Arc::new(FakeAuditRepository::default());
    let clock = Arc::new(ManualClock::new(fixed_instant()));
    let authorization = AuthorizationService::new(
        grants.clone(),
        ScopeResolver::new(Arc::new(provider), config.metadata_lookup_timeout),
        AuditLogger::new(audits.clone(), config.evaluation_timeout),
        clock.clone(),
        config,
    );
    let admin = SecurityAdminService::new(authorization.clone(), grants.clone());

    Harness {
        authorization,
        admin,
        grants,
        audits,
        clock,
    }
}

/// Metadata where context `c1` belongs to team `t1` in org `o1`, and memory
/// `m1` belongs to team `t1`.
pub(crate) fn standard_metadata() -> FakeMetadataProvider {
    FakeMetadataProvider::default()
        .with_owner(ResourceKind::Context, "c1", Some("t1"), Some("o1"))
        .with_owner(ResourceKind::Team, "t1", None, Some("o1"))
        .with_owner(ResourceKind::Memory, "m1", Some("t1"), Some("o1"))
}

pub(crate) fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(|| unreachable!())
}

pub(crate) struct ManualClock {
    now: StdMutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(now),
        }
    }

    pub(crate) fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|_| unreachable!());
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|_| unreachable!())
    }
}

enum MetadataBehavior {
    Normal,
    Failing,
    Slow(Duration),
}

pub(crate) struct FakeMetadataProvider {
    owners: HashMap<(ResourceKind, String), ResourceOwnership>,
    behavior: MetadataBehavior,
}

impl Default for FakeMetadataProvider {
    fn default() -> Self {
        Self {
            owners: HashMap::new(),
            behavior: MetadataBehavior::Normal,
        }
    }
}

impl FakeMetadataProvider {
    pub(crate) fn failing() -> Self {
        Self {
            behavior: MetadataBehavior::Failing,
            ..Self::default()
        }
    }

    pub(crate) fn slow(delay: Duration) -> Self {
        Self {
            behavior: MetadataBehavior::Slow(delay),
            ..Self::default()
        }
    }

    pub(crate) fn with_owner(
        mut self,
        resource: ResourceKind,
        resource_id: &str,
        team_id: Option<&str>,
        org_id: Option<&str>,
    ) -> Self {
        self.owners.insert(
            (resource, resource_id.to_owned()),
            ResourceOwnership {
                team_id: team_id.map(str::to_owned),
                org_id: org_id.map(str::to_owned),
            },
        );
        self
    }
}

#[async_trait]
impl ResourceMetadataProvider for FakeMetadataProvider {
    async fn get_owning_team_and_org(
        &self,
        resource: ResourceKind,
        resource_id: &str,
    ) -> AppResult<Option<ResourceOwnership>> {
        match self.behavior {
            MetadataBehavior::Normal => {}
            MetadataBehavior::Failing => {
                return Err(AppError::Internal("metadata service returned 503".to_owned()));
            }
            MetadataBehavior::Slow(delay) => tokio::time::sleep(delay).await,
        }

        Ok(self.owners.get(&(resource, resource_id.to_owned())).cloned())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    records: Mutex<Vec<PermissionAuditRecord>>,
    failing: AtomicBool,
    refused_user: StdMutex<Option<String>>,
}

impl FakeAuditRepository {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every entry of the user an entry the store can never accept.
    pub(crate) fn refuse_user(&self, user_id: &str) {
        *self
            .refused_user
            .lock()
            .unwrap_or_else(|_| unreachable!()) = Some(user_id.to_owned());
    }

    pub(crate) async fn entries(&self) -> Vec<PermissionAuditEntry> {
        self.records
            .lock()
            .await
            .iter()
            .map(|record| record.entry.clone())
            .collect()
    }

    pub(crate) async fn records(&self) -> Vec<PermissionAuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl PermissionAuditRepository for FakeAuditRepository {
    async fn append_audit(&self, entry: &PermissionAuditEntry) -> AppResult<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit store unavailable".to_owned()));
        }
        let refused = self
            .refused_user
            .lock()
            .unwrap_or_else(|_| unreachable!())
            .as_deref()
            == Some(entry.user_id.as_str());
        if refused {
            return Err(AppError::Validation(
                "audit store cannot hold this entry".to_owned(),
            ));
        }

        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|record| record.entry.audit_id == entry.audit_id)
        {
            return Ok(false);
        }

        let previous_hash = records
            .last()
            .map(|record| record.record_hash.clone())
            .unwrap_or_else(|| AUDIT_GENESIS_HASH.to_owned());
        let record_hash = audit_record_digest(&previous_hash, entry);
        let sequence = i64::try_from(records.len()).unwrap_or_else(|_| unreachable!()) + 1;
        records.push(PermissionAuditRecord {
            sequence,
            entry: entry.clone(),
            previous_hash,
            record_hash,
        });
        Ok(true)
    }

    async fn list_audits(&self, query: &AuditStreamQuery) -> AppResult<Vec<PermissionAuditRecord>> {
        Ok(self
            .records
            .lock()
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

#[derive(Default)]
struct GrantState {
    assignments: Vec<RoleAssignment>,
    delegations: Vec<PermissionDelegation>,
    access_requests: Vec<AccessRequest>,
}

#[derive(Default)]
pub(crate) struct FakeGrantStore {
    state: Mutex<GrantState>,
    failing_reads: AtomicBool,
    read_delay: StdMutex<Option<Duration>>,
}

impl FakeGrantStore {
    pub(crate) fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap_or_else(|_| unreachable!()) = Some(delay);
    }

    pub(crate) async fn seed_assignment(
        &self,
        user_id: &str,
        role: Role,
        scope: Scope,
        expires_at: Option<DateTime<Utc>>,
    ) -> Uuid {
        let assignment_id = Uuid::new_v4();
        self.state.lock().await.assignments.push(RoleAssignment {
            assignment_id,
            user_id: user_id.to_owned(),
            role,
            scope,
            granted_by: "seed".to_owned(),
            granted_at: fixed_instant() - TimeDelta::days(1),
            expires_at,
            is_active: true,
            revoked_by: None,
            revoked_at: None,
        });
        assignment_id
    }

    pub(crate) async fn seed_delegation(&self, delegation: PermissionDelegation) {
        self.state.lock().await.delegations.push(delegation);
    }

    pub(crate) async fn seed_access_request(&self, request: AccessRequest) {
        self.state.lock().await.access_requests.push(request);
    }

    pub(crate) async fn assignments(&self) -> Vec<RoleAssignment> {
        self.state.lock().await.assignments.clone()
    }
}

#[async_trait]
impl AuthorizationRepository for FakeGrantStore {
    async fn load_grant_snapshot(
        &self,
        principal: &str,
        chain: &ScopeChain,
        _as_of: DateTime<Utc>,
    ) -> AppResult<GrantSnapshot> {
        let delay = *self.read_delay.lock().unwrap_or_else(|_| unreachable!());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(AppError::Internal("connection reset".to_owned()));
        }

        let state = self.state.lock().await;
        Ok(GrantSnapshot {
            assignments: state
                .assignments
                .iter()
                .filter(|value| value.user_id == principal && chain.contains(&value.scope))
                .cloned()
                .collect(),
            delegations: state
                .delegations
                .iter()
                .filter(|value| value.delegate_id == principal && chain.contains(&value.scope))
                .cloned()
                .collect(),
            access_requests: state
                .access_requests
                .iter()
                .filter(|value| value.requester_id == principal && chain.contains(&value.scope))
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl SecurityAdminRepository for FakeGrantStore {
    async fn insert_role_assignment(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let same_tuple = |value: &RoleAssignment| {
            value.is_active
                && value.user_id == assignment.user_id
                && value.scope == assignment.scope
        };
        if state
            .assignments
            .iter()
            .any(|value| same_tuple(value) && value.is_effective_at(as_of))
        {
            return Err(AppError::Conflict("assignment already exists".to_owned()));
        }
        for value in state.assignments.iter_mut().filter(|value| same_tuple(value)) {
            value.is_active = false;
        }
        state.assignments.push(assignment.clone());
        Ok(())
    }

    async fn insert_bootstrap_assignment(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .assignments
            .iter()
            .any(|value| value.role == Role::System && value.is_effective_at(as_of))
        {
            return Err(AppError::Conflict("system principal exists".to_owned()));
        }
        state.assignments.push(assignment.clone());
        Ok(())
    }

    async fn find_role_assignment(&self, assignment_id: Uuid) -> AppResult<Option<RoleAssignment>> {
        Ok(self
            .state
            .lock()
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
        let mut state = self.state.lock().await;
        if let Some(value) = state
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
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|value| query.user_id.as_deref().is_none_or(|id| value.user_id == id))
            .filter(|value| query.scope.as_ref().is_none_or(|scope| &value.scope == scope))
            .filter(|value| query.effective_at.is_none_or(|at| value.is_effective_at(at)))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn insert_delegation(&self, delegation: &PermissionDelegation) -> AppResult<()> {
        self.state.lock().await.delegations.push(delegation.clone());
        Ok(())
    }

    async fn find_delegation(
        &self,
        delegation_id: Uuid,
    ) -> AppResult<Option<PermissionDelegation>> {
        Ok(self
            .state
            .lock()
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
        let mut state = self.state.lock().await;
        if let Some(value) = state
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
        Ok(self
            .state
            .lock()
            .await
            .delegations
            .iter()
            .filter(|value| {
                query
                    .delegator_id
                    .as_deref()
                    .is_none_or(|id| value.delegator_id == id)
            })
            .filter(|value| query.delegate_id.as_deref().is_none_or(|id| value.delegate_id == id))
            .filter(|value| query.scope.as_ref().is_none_or(|scope| &value.scope == scope))
            .filter(|value| query.effective_at.is_none_or(|at| value.is_effective_at(at)))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn insert_access_request(&self, request: &AccessRequest) -> AppResult<()> {
        self.state.lock().await.access_requests.push(request.clone());
        Ok(())
    }

    async fn find_access_request(&self, request_id: Uuid) -> AppResult<Option<AccessRequest>> {
        Ok(self
            .state
            .lock()
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
        let mut state = self.state.lock().await;
        let Some(value) = state.access_requests.iter_mut().find(|value| {
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
        Ok(self
            .state
            .lock()
            .await
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
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }
}
