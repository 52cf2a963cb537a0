use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Role, Scope};

/// A role granted to a user at one scope.
///
/// Assignments are soft-deleted through `is_active`; expiry is authoritative
/// over the flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Stable assignment id.
    pub assignment_id: Uuid,
    /// Assigned principal.
    pub user_id: String,
    /// Granted role.
    pub role: Role,
    /// Scope the role applies to.
    pub scope: Scope,
    /// Principal that granted the role.
    pub granted_by: String,
    /// Grant timestamp.
    pub granted_at: DateTime<Utc>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Soft-delete marker.
    pub is_active: bool,
    /// Principal that revoked the assignment, when revoked.
    pub revoked_by: Option<String>,
    /// Revocation timestamp, when revoked.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RoleAssignment {
    /// Returns whether the assignment can contribute to a decision at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self
                .expires_at
                .is_none_or(|expires_at| expires_at > now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::RoleAssignment;
    use crate::{Role, Scope};

    fn assignment() -> RoleAssignment {
        RoleAssignment {
            assignment_id: Uuid::new_v4(),
            user_id: "alice".to_owned(),
            role: Role::Admin,
            scope: Scope::Org("o1".to_owned()),
            granted_by: "root".to_owned(),
            granted_at: Utc::now(),
            expires_at: None,
            is_active: true,
            revoked_by: None,
            revoked_at: None,
        }
    }

    #[test]
    fn expired_assignment_is_not_effective_even_when_active() {
        let now = Utc::now();
        let mut value = assignment();
        value.expires_at = Some(now - Duration::seconds(1));
        assert!(value.is_active);
        assert!(!value.is_effective_at(now));
    }

    #[test]
    fn expiry_at_exactly_now_is_not_effective() {
        let now = Utc::now();
        let mut value = assignment();
        value.expires_at = Some(now);
        assert!(!value.is_effective_at(now));
    }

    #[test]
    fn revoked_assignment_is_not_effective() {
        let mut value = assignment();
        value.is_active = false;
        assert!(!value.is_effective_at(Utc::now()));
    }
}
