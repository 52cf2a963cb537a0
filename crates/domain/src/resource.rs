use std::fmt::{Display, Formatter};
use std::str::FromStr;

use gatehouse_core::AppError;
use serde::{Deserialize, Serialize};

use crate::Scope;

/// Actions gated by the role catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Reads a resource.
    Read,
    /// Creates a resource.
    Create,
    /// Mutates a resource.
    Update,
    /// Deletes a resource.
    Delete,
    /// Shares a resource with other principals.
    Share,
    /// Administers access on a scope: assignments, delegations, reviews.
    Administer,
}

impl Action {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Share => "share",
            Self::Administer => "administer",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Action] = &[
            Action::Read,
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::Share,
            Action::Administer,
        ];

        ALL
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Self::Read),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "share" => Ok(Self::Share),
            "administer" => Ok(Self::Administer),
            _ => Err(AppError::Validation(format!(
                "unknown action value '{value}'"
            ))),
        }
    }
}

impl Display for Action {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Resource kinds known to the role catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A stored memory item.
    Memory,
    /// A context grouping memories.
    Context,
    /// A team.
    Team,
    /// An organization.
    #[serde(rename = "org")]
    Organization,
    /// The permission audit stream.
    AuditLog,
}

impl ResourceKind {
    /// Returns a stable storage value for this resource kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Context => "context",
            Self::Team => "team",
            Self::Organization => "org",
            Self::AuditLog => "audit_log",
        }
    }

    /// Returns all known resource kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ResourceKind] = &[
            ResourceKind::Memory,
            ResourceKind::Context,
            ResourceKind::Team,
            ResourceKind::Organization,
            ResourceKind::AuditLog,
        ];

        ALL
    }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "memory" => Ok(Self::Memory),
            "context" => Ok(Self::Context),
            "team" => Ok(Self::Team),
            "org" => Ok(Self::Organization),
            "audit_log" => Ok(Self::AuditLog),
            _ => Err(AppError::Validation(format!(
                "unknown resource value '{value}'"
            ))),
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Reference to the resource an evaluation targets.
///
/// A missing id addresses the resource kind as a whole, which resolves to the
/// global scope only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource identifier, when one resource is addressed.
    pub id: Option<String>,
}

impl ResourceRef {
    /// Creates a reference to one resource.
    #[must_use]
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: Some(id.into()),
        }
    }

    /// Creates a reference to a resource kind without a specific id.
    #[must_use]
    pub fn kind_only(kind: ResourceKind) -> Self {
        Self { kind, id: None }
    }

    /// Returns the resource that stands for a scope in `administer` checks.
    #[must_use]
    pub fn for_scope(scope: &Scope) -> Self {
        match scope {
            Scope::Global => Self::kind_only(ResourceKind::Organization),
            Scope::Org(id) => Self::new(ResourceKind::Organization, id.clone()),
            Scope::Team(id) => Self::new(ResourceKind::Team, id.clone()),
            Scope::Context(id) => Self::new(ResourceKind::Context, id.clone()),
        }
    }

    /// Returns the resource id slice when present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Display for ResourceRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(formatter, "{}:{id}", self.kind),
            None => write!(formatter, "{}:*", self.kind),
        }
    }
}
