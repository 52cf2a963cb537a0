//! Shared primitives for all Rust crates in Gatehouse.

#![forbid(unsafe_code)]

/// Authenticated principal primitives shared across services.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::PrincipalId;

/// Result type used across Gatehouse crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
///
/// The last five variants form the authorization taxonomy surfaced to callers
/// of mutation endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Principal is blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Scope type and scope id do not form a valid combination.
    #[error("malformed scope: {0}")]
    MalformedScope(String),

    /// Granter lacks authority over the role or scope being granted.
    #[error("privilege escalation: {0}")]
    PrivilegeEscalation(String),

    /// Delegator does not hold every delegated action.
    #[error("insufficient rights: {0}")]
    InsufficientRights(String),

    /// Access request already left the pending state.
    #[error("already reviewed: {0}")]
    AlreadyReviewed(String),

    /// Resource metadata could not be resolved in time.
    #[error("metadata unavailable: {0}")]
    MetadataUnavailable(String),
}

impl AppError {
    /// Returns a stable, detail-free code for audit metadata and logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::Internal(_) => "internal",
            Self::MalformedScope(_) => "malformed_scope",
            Self::PrivilegeEscalation(_) => "privilege_escalation",
            Self::InsufficientRights(_) => "insufficient_rights",
            Self::AlreadyReviewed(_) => "already_reviewed",
            Self::MetadataUnavailable(_) => "metadata_unavailable",
        }
    }
}
