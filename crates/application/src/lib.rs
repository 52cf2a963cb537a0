//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_logger;
mod audit_ports;
mod authorization_ports;
mod authorization_service;
mod config;
mod scope_resolver;
mod security_admin_ports;
mod security_admin_service;

#[cfg(test)]
mod test_support;

pub use audit_logger::{AuditHealth, AuditLogger};
pub use audit_ports::{AuditStreamQuery, PermissionAuditRepository};
pub use authorization_ports::{
    AuthorizationRepository, Clock, ResourceMetadataProvider, ResourceOwnership, SystemClock,
};
pub use authorization_service::{AuthorizationService, HeldRights};
pub use config::AuthorizationConfig;
pub use scope_resolver::ScopeResolver;
pub use security_admin_ports::{
    AccessRequestQuery, CreateDelegationInput, CreateRoleAssignmentInput, DelegationQuery,
    ReviewAccessRequestInput, ReviewTransition, RoleAssignmentQuery, SecurityAdminRepository,
    SubmitAccessRequestInput,
};
pub use security_admin_service::SecurityAdminService;
