//! Role catalog: the role order and the resource/action matrix.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use gatehouse_core::AppError;
use serde::{Deserialize, Serialize};

use crate::{Action, ResourceKind};

/// Roles in ascending order of authority.
///
/// `System` is not just the top rank: every check that could grant it
/// authority matches it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access.
    Viewer,
    /// Contributes content.
    Member,
    /// Curates content and structure.
    Maintainer,
    /// Administers access within a scope.
    Admin,
    /// Owns a scope.
    Owner,
    /// Platform operator with implicit access to everything.
    System,
}

impl Role {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Member => "member",
            Self::Maintainer => "maintainer",
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::System => "system",
        }
    }

    /// Returns all roles in ascending order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[
            Role::Viewer,
            Role::Member,
            Role::Maintainer,
            Role::Admin,
            Role::Owner,
            Role::System,
        ];

        ALL
    }

    /// Returns the position of the role in the total order.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Viewer => 1,
            Self::Member => 2,
            Self::Maintainer => 3,
            Self::Admin => 4,
            Self::Owner => 5,
            Self::System => 6,
        }
    }

    /// Returns whether this role carries at least the authority of `required`.
    #[must_use]
    pub fn holds_at_least(&self, required: Role) -> bool {
        match (self, required) {
            (Self::System, _) => true,
            (_, Self::System) => false,
            (held, required) => held.rank() >= required.rank(),
        }
    }

    /// Returns whether this role permits the action on the resource kind.
    #[must_use]
    pub fn permits(&self, resource: ResourceKind, action: Action) -> bool {
        match self {
            Self::System => true,
            role => role.holds_at_least(minimum_role(resource, action)),
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "viewer" => Ok(Self::Viewer),
            "member" => Ok(Self::Member),
            "maintainer" => Ok(Self::Maintainer),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            "system" => Ok(Self::System),
            _ => Err(AppError::Validation(format!("unknown role value '{value}'"))),
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Returns the least role that permits the action on the resource kind.
///
/// Audit log mutations require `System`: the audit stream is append-only and
/// written by the evaluator, never by principals.
#[must_use]
pub fn minimum_role(resource: ResourceKind, action: Action) -> Role {
    use Action::{Administer, Create, Delete, Read, Share, Update};
    use ResourceKind::{AuditLog, Context, Memory, Organization, Team};

    match (resource, action) {
        (Memory | Context | Team | Organization, Read) => Role::Viewer,
        (Memory, Create | Update) => Role::Member,
        (Memory, Delete | Share) => Role::Maintainer,
        (Context, Create) => Role::Member,
        (Context, Update | Delete | Share) => Role::Maintainer,
        (Team, Update) => Role::Maintainer,
        (Team, Create) => Role::Admin,
        (Team, Delete | Share) => Role::Owner,
        (Organization, Create | Update | Delete | Share) => Role::Owner,
        (AuditLog, Read) => Role::Admin,
        (AuditLog, Create | Update | Delete | Share) => Role::System,
        (Memory | Context | Team | Organization | AuditLog, Administer) => Role::Admin,
    }
}

/// Returns whether the role permits the action on the resource kind.
#[must_use]
pub fn role_permits(role: Role, resource: ResourceKind, action: Action) -> bool {
    role.permits(resource, action)
}

/// Returns the rank of a role in the total order.
#[must_use]
pub fn role_rank(role: Role) -> u8 {
    role.rank()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::{Role, minimum_role, role_permits};
    use crate::{Action, ResourceKind};

    fn any_role() -> impl Strategy<Value = Role> {
        proptest::sample::select(Role::all().to_vec())
    }

    fn any_action() -> impl Strategy<Value = Action> {
        proptest::sample::select(Action::all().to_vec())
    }

    fn any_resource() -> impl Strategy<Value = ResourceKind> {
        proptest::sample::select(ResourceKind::all().to_vec())
    }

    #[test]
    fn member_cannot_delete_memory() {
        assert!(!role_permits(
            Role::Member,
            ResourceKind::Memory,
            Action::Delete
        ));
        assert!(role_permits(
            Role::Member,
            ResourceKind::Memory,
            Action::Update
        ));
    }

    #[test]
    fn viewer_cannot_update_context() {
        assert!(!Role::Viewer.permits(ResourceKind::Context, Action::Update));
        assert!(Role::Viewer.permits(ResourceKind::Context, Action::Read));
    }

    #[test]
    fn administer_requires_admin() {
        assert!(!Role::Maintainer.permits(ResourceKind::Team, Action::Administer));
        assert!(Role::Admin.permits(ResourceKind::Team, Action::Administer));
    }

    #[test]
    fn only_system_mutates_audit_log() {
        assert!(!Role::Owner.permits(ResourceKind::AuditLog, Action::Delete));
        assert!(Role::System.permits(ResourceKind::AuditLog, Action::Delete));
        assert_eq!(
            minimum_role(ResourceKind::AuditLog, Action::Update),
            Role::System
        );
    }

    #[test]
    fn role_parses_only_storage_values() {
        for role in Role::all() {
            assert_eq!(Role::from_str(role.as_str()).ok(), Some(*role));
        }
        assert!(Role::from_str("OWNER").is_err());
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn no_role_below_system_holds_system() {
        for role in Role::all() {
            let expected = *role == Role::System;
            assert_eq!(role.holds_at_least(Role::System), expected);
        }
    }

    proptest! {
        #[test]
        fn system_permits_everything(resource in any_resource(), action in any_action()) {
            prop_assert!(Role::System.permits(resource, action));
        }

        #[test]
        fn permissions_are_monotonic_in_rank(
            lower in any_role(),
            higher in any_role(),
            resource in any_resource(),
            action in any_action(),
        ) {
            if higher.holds_at_least(lower) && lower.permits(resource, action) {
                prop_assert!(higher.permits(resource, action));
            }
        }

        #[test]
        fn holds_at_least_is_reflexive(role in any_role()) {
            prop_assert!(role.holds_at_least(role));
        }
    }
}
