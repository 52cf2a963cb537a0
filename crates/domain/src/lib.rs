//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access_request;
mod assignment;
mod audit;
mod decision;
mod delegation;
mod resolution;
mod resource;
mod role;
mod scope;

pub use access_request::{
    AccessRequest, AccessRequestStatus, EffectiveAccessRequestStatus, ReviewDecision,
};
pub use assignment::RoleAssignment;
pub use audit::{
    AUDIT_GENESIS_HASH, AuditChainVerification, PermissionAuditEntry, PermissionAuditRecord,
    audit_record_digest, verify_audit_chain,
};
pub use decision::{AuditId, Decision, EvaluationFault, GrantRef, RequestContext};
pub use delegation::PermissionDelegation;
pub use resolution::{GrantSnapshot, ResolutionMode};
pub use resource::{Action, ResourceKind, ResourceRef};
pub use role::{Role, minimum_role, role_permits, role_rank};
pub use scope::{Scope, ScopeChain, ScopeType};
