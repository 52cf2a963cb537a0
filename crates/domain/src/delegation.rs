use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Action, ResourceKind, ResourceRef, Scope, ScopeChain};

/// A time-bounded grant of specific actions from one principal to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDelegation {
    /// Stable delegation id.
    pub delegation_id: Uuid,
    /// Principal granting the actions.
    pub delegator_id: String,
    /// Principal receiving the actions.
    pub delegate_id: String,
    /// Resource kind covered by the delegation.
    pub resource: ResourceKind,
    /// Delegated actions.
    pub actions: BTreeSet<Action>,
    /// Specific resource id, or every resource of the kind when absent.
    pub resource_id: Option<String>,
    /// Scope the delegation applies to.
    pub scope: Scope,
    /// Grant timestamp.
    pub granted_at: DateTime<Utc>,
    /// Mandatory expiry.
    pub expires_at: DateTime<Utc>,
    /// Early revocation marker.
    pub is_active: bool,
    /// Justification captured at grant time.
    pub reason: String,
    /// Principal that revoked the delegation, when revoked.
    pub revoked_by: Option<String>,
    /// Revocation timestamp, when revoked.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl PermissionDelegation {
    /// Returns whether the delegation can contribute to a decision at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }

    /// Returns whether the delegation covers the action on the resource.
    #[must_use]
    pub fn covers(
        &self,
        action: Action,
        resource: &ResourceRef,
        chain: &ScopeChain,
        now: DateTime<Utc>,
    ) -> bool {
        self.is_effective_at(now)
            && self.resource == resource.kind
            && self.actions.contains(&action)
            && resource_id_matches(self.resource_id.as_deref(), resource.id())
            && chain.contains(&self.scope)
    }
}

/// Returns whether a grant's resource id covers the requested id.
///
/// A grant without an id is a wildcard over the resource kind.
pub(crate) fn resource_id_matches(granted: Option<&str>, requested: Option<&str>) -> bool {
    match granted {
        None => true,
        Some(granted) => requested == Some(granted),
    }
}
