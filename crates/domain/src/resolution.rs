//! Pure grant resolution over one consistent read snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AccessRequest, Action, GrantRef, PermissionDelegation, ResourceRef, Role, RoleAssignment,
    ScopeChain,
};

/// Which grant sources participate in a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Assignments, then delegations, then approved access requests.
    Full,
    /// Assignments only; used when checking rights a principal personally holds.
    AssignmentsOnly,
}

/// Grant rows of one principal within one scope chain, read together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSnapshot {
    /// Role assignments of the principal.
    pub assignments: Vec<RoleAssignment>,
    /// Delegations received by the principal.
    pub delegations: Vec<PermissionDelegation>,
    /// Access requests filed by the principal.
    pub access_requests: Vec<AccessRequest>,
}

impl GrantSnapshot {
    /// Returns the assignment at the most specific scope that holds one.
    ///
    /// Rows outside the chain, belonging to another principal, revoked, or
    /// expired are ignored regardless of what the store returned.
    #[must_use]
    pub fn effective_assignment(
        &self,
        principal: &str,
        chain: &ScopeChain,
        now: DateTime<Utc>,
    ) -> Option<&RoleAssignment> {
        chain.scopes().iter().find_map(|scope| {
            self.assignments.iter().find(|assignment| {
                assignment.user_id == principal
                    && &assignment.scope == scope
                    && assignment.is_effective_at(now)
            })
        })
    }

    /// Returns whether the principal's effective assignment carries `required`.
    #[must_use]
    pub fn holds_role_at_least(
        &self,
        principal: &str,
        chain: &ScopeChain,
        now: DateTime<Utc>,
        required: Role,
    ) -> bool {
        self.effective_assignment(principal, chain, now)
            .is_some_and(|assignment| assignment.role.holds_at_least(required))
    }

    /// Resolves the grant allowing the action, if any.
    ///
    /// The most specific assignment decides the assignment step even when its
    /// role does not permit the action. Delegations and approved requests are
    /// consulted next, in that order, preferring the most specific scope.
    #[must_use]
    pub fn resolve(
        &self,
        principal: &str,
        action: Action,
        resource: &ResourceRef,
        chain: &ScopeChain,
        now: DateTime<Utc>,
        mode: ResolutionMode,
    ) -> Option<GrantRef> {
        if let Some(assignment) = self.effective_assignment(principal, chain, now)
            && assignment.role.permits(resource.kind, action)
        {
            return Some(GrantRef::Assignment {
                assignment_id: assignment.assignment_id,
                role: assignment.role,
                scope: assignment.scope.clone(),
            });
        }

        if mode == ResolutionMode::AssignmentsOnly {
            return None;
        }

        let delegation = self
            .delegations
            .iter()
            .filter(|delegation| {
                delegation.delegate_id == principal
                    && delegation.covers(action, resource, chain, now)
            })
            .min_by_key(|delegation| chain.position(&delegation.scope));
        if let Some(delegation) = delegation {
            return Some(GrantRef::Delegation {
                delegation_id: delegation.delegation_id,
                delegator_id: delegation.delegator_id.clone(),
                scope: delegation.scope.clone(),
            });
        }

        self.access_requests
            .iter()
            .filter(|request| {
                request.requester_id == principal && request.grants(action, resource, chain, now)
            })
            .min_by_key(|request| chain.position(&request.scope))
            .map(|request| GrantRef::AccessRequest {
                request_id: request.request_id,
                scope: request.scope.clone(),
            })
    }
}
