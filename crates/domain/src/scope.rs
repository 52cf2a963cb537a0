use std::fmt::{Display, Formatter};
use std::str::FromStr;

use gatehouse_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Breadth at which a grant applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    /// Platform-wide.
    Global,
    /// One organization.
    Org,
    /// One team.
    Team,
    /// One context.
    Context,
}

impl ScopeType {
    /// Returns a stable storage value for this scope type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Org => "org",
            Self::Team => "team",
            Self::Context => "context",
        }
    }
}

impl FromStr for ScopeType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "global" => Ok(Self::Global),
            "org" => Ok(Self::Org),
            "team" => Ok(Self::Team),
            "context" => Ok(Self::Context),
            _ => Err(AppError::MalformedScope(format!(
                "unknown scope type '{value}'"
            ))),
        }
    }
}

impl Display for ScopeType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A validated scope.
///
/// Non-global scopes always carry an id; the global scope never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope_type", content = "scope_id", rename_all = "snake_case")]
pub enum Scope {
    /// Platform-wide scope.
    Global,
    /// Organization scope.
    Org(String),
    /// Team scope.
    Team(String),
    /// Context scope.
    Context(String),
}

impl Scope {
    /// Builds a scope from its persisted or transport parts.
    pub fn from_parts(scope_type: ScopeType, scope_id: Option<&str>) -> AppResult<Self> {
        let scope_id = scope_id.map(str::trim);

        match (scope_type, scope_id) {
            (ScopeType::Global, None) => Ok(Self::Global),
            (ScopeType::Global, Some(id)) => Err(AppError::MalformedScope(format!(
                "global scope must not carry a scope id, got '{id}'"
            ))),
            (scope_type, None) => Err(AppError::MalformedScope(format!(
                "{scope_type} scope requires a scope id"
            ))),
            (scope_type, Some("")) => Err(AppError::MalformedScope(format!(
                "{scope_type} scope id must not be blank"
            ))),
            (scope_type, Some(id)) if id.contains('\0') => Err(AppError::MalformedScope(format!(
                "{scope_type} scope id must not contain NUL characters"
            ))),
            (ScopeType::Org, Some(id)) => Ok(Self::Org(id.to_owned())),
            (ScopeType::Team, Some(id)) => Ok(Self::Team(id.to_owned())),
            (ScopeType::Context, Some(id)) => Ok(Self::Context(id.to_owned())),
        }
    }

    /// Parses a scope from raw string parts.
    pub fn parse(scope_type: &str, scope_id: Option<&str>) -> AppResult<Self> {
        Self::from_parts(ScopeType::from_str(scope_type)?, scope_id)
    }

    /// Returns the scope type.
    #[must_use]
    pub fn scope_type(&self) -> ScopeType {
        match self {
            Self::Global => ScopeType::Global,
            Self::Org(_) => ScopeType::Org,
            Self::Team(_) => ScopeType::Team,
            Self::Context(_) => ScopeType::Context,
        }
    }

    /// Returns the scope id, absent for the global scope.
    #[must_use]
    pub fn scope_id(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Org(id) | Self::Team(id) | Self::Context(id) => Some(id.as_str()),
        }
    }
}

impl Display for Scope {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self.scope_id() {
            Some(id) => write!(formatter, "{}:{id}", self.scope_type()),
            None => formatter.write_str("global"),
        }
    }
}

/// Ordered scopes from most specific to global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeChain(Vec<Scope>);

impl ScopeChain {
    /// Returns the chain holding only the global scope.
    #[must_use]
    pub fn global_only() -> Self {
        Self(vec![Scope::Global])
    }

    /// Builds a chain from the optional scopes of a resource.
    ///
    /// Absent links are skipped and `Global` is always appended last.
    #[must_use]
    pub fn from_links(
        context_id: Option<&str>,
        team_id: Option<&str>,
        org_id: Option<&str>,
    ) -> Self {
        let candidates = [
            context_id.map(|id| Scope::Context(id.to_owned())),
            team_id.map(|id| Scope::Team(id.to_owned())),
            org_id.map(|id| Scope::Org(id.to_owned())),
        ];

        let mut scopes = Vec::with_capacity(4);
        for scope in candidates.into_iter().flatten() {
            let blank = scope.scope_id().is_none_or(|id| id.trim().is_empty());
            if !blank && !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        scopes.push(Scope::Global);

        Self(scopes)
    }

    /// Returns the scopes, most specific first.
    #[must_use]
    pub fn scopes(&self) -> &[Scope] {
        self.0.as_slice()
    }

    /// Returns the most specific scope.
    #[must_use]
    pub fn most_specific(&self) -> &Scope {
        self.0.first().unwrap_or(&Scope::Global)
    }

    /// Returns whether the scope participates in the chain.
    #[must_use]
    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains(scope)
    }

    /// Returns the distance of the scope from the most specific link.
    #[must_use]
    pub fn position(&self, scope: &Scope) -> Option<usize> {
        self.0.iter().position(|candidate| candidate == scope)
    }
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::global_only()
    }
}
