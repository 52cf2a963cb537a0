use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gatehouse_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delegation::resource_id_matches;
use crate::{Action, ResourceKind, ResourceRef, Scope, ScopeChain};

/// Persisted status of an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRequestStatus {
    /// Awaiting review.
    Pending,
    /// Approved by a reviewer.
    Approved,
    /// Rejected by a reviewer.
    Rejected,
}

impl AccessRequestStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for AccessRequestStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown access request status '{value}'"
            ))),
        }
    }
}

impl Display for AccessRequestStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Status of an access request as observed at a point in time.
///
/// Expiry never rewrites the persisted status, so a pending request that ran
/// out of time stays `pending` in storage and reads as `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveAccessRequestStatus {
    /// Awaiting review and still within its window.
    Pending,
    /// Approved and still within its window.
    Approved,
    /// Rejected by a reviewer.
    Rejected,
    /// Past its expiry: treated as rejected when pending and as absent when approved.
    Expired,
}

impl EffectiveAccessRequestStatus {
    /// Returns a stable transport value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

/// Reviewer verdict on a pending access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Grant the requested access.
    Approve,
    /// Deny the requested access.
    Reject,
}

impl ReviewDecision {
    /// Returns the terminal status this decision transitions to.
    #[must_use]
    pub fn target_status(&self) -> AccessRequestStatus {
        match self {
            Self::Approve => AccessRequestStatus::Approved,
            Self::Reject => AccessRequestStatus::Rejected,
        }
    }
}

/// A principal's request for access it does not currently hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Stable request id.
    pub request_id: Uuid,
    /// Requesting principal.
    pub requester_id: String,
    /// Requested resource kind.
    pub resource: ResourceKind,
    /// Requested action.
    pub action: Action,
    /// Requested resource id, or the whole kind when absent.
    pub resource_id: Option<String>,
    /// Scope the request targets.
    pub scope: Scope,
    /// Requester justification.
    pub justification: String,
    /// Submission timestamp.
    pub requested_at: DateTime<Utc>,
    /// Persisted status.
    pub status: AccessRequestStatus,
    /// Reviewer, once reviewed.
    pub reviewed_by: Option<String>,
    /// Review timestamp, once reviewed.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reviewer note.
    pub review_reason: Option<String>,
    /// End of the review window and of any granted access.
    pub expires_at: DateTime<Utc>,
}

impl AccessRequest {
    /// Returns the status as observed at `now`.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> EffectiveAccessRequestStatus {
        let expired = self.expires_at <= now;
        match self.status {
            AccessRequestStatus::Rejected => EffectiveAccessRequestStatus::Rejected,
            _ if expired => EffectiveAccessRequestStatus::Expired,
            AccessRequestStatus::Pending => EffectiveAccessRequestStatus::Pending,
            AccessRequestStatus::Approved => EffectiveAccessRequestStatus::Approved,
        }
    }

    /// Returns whether this request grants the action on the resource at `now`.
    #[must_use]
    pub fn grants(
        &self,
        action: Action,
        resource: &ResourceRef,
        chain: &ScopeChain,
        now: DateTime<Utc>,
    ) -> bool {
        self.effective_status(now) == EffectiveAccessRequestStatus::Approved
            && self.action == action
            && self.resource == resource.kind
            && resource_id_matches(self.resource_id.as_deref(), resource.id())
            && chain.contains(&self.scope)
    }
}
