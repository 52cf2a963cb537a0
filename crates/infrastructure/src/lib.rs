//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod audit_replay;
mod http_resource_metadata_provider;
mod in_memory_authorization_store;
mod in_memory_resource_metadata_provider;
mod postgres_authorization_repository;
mod postgres_grant_rows;
mod postgres_permission_audit_repository;
mod postgres_security_admin_repository;

pub use audit_replay::spawn_audit_replay;
pub use http_resource_metadata_provider::HttpResourceMetadataProvider;
pub use in_memory_authorization_store::InMemoryAuthorizationStore;
pub use in_memory_resource_metadata_provider::InMemoryResourceMetadataProvider;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_permission_audit_repository::PostgresPermissionAuditRepository;
pub use postgres_security_admin_repository::PostgresSecurityAdminRepository;
