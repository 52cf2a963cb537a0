use std::sync::Arc;

use gatehouse_application::{
    AuditLogger, AuthorizationConfig, AuthorizationService, ResourceMetadataProvider,
    ScopeResolver, SecurityAdminService, SystemClock,
};
use gatehouse_core::{AppError, AppResult};
use gatehouse_infrastructure::{
    HttpResourceMetadataProvider, InMemoryResourceMetadataProvider,
    PostgresAuthorizationRepository, PostgresPermissionAuditRepository,
    PostgresSecurityAdminRepository,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use url::Url;

pub struct AdminServices {
    pub authorization: AuthorizationService,
    pub admin: SecurityAdminService,
}

pub async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))
}

/// Builds the metadata provider used for scope resolution.
///
/// Without a metadata service every named resource resolves to the global
/// scope only, which is enough for commands that never look up ownership.
pub fn build_metadata_provider(
    metadata_base_url: Option<&Url>,
    config: &AuthorizationConfig,
) -> AppResult<Arc<dyn ResourceMetadataProvider>> {
    let Some(base_url) = metadata_base_url else {
        return Ok(Arc::new(InMemoryResourceMetadataProvider::new()));
    };

    let http_client = reqwest::Client::builder()
        .timeout(config.metadata_lookup_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    Ok(Arc::new(HttpResourceMetadataProvider::new(
        http_client,
        base_url.clone(),
    )?))
}

pub fn build_admin_services(
    pool: PgPool,
    metadata_provider: Arc<dyn ResourceMetadataProvider>,
    config: AuthorizationConfig,
) -> AdminServices {
    let authorization_repository = Arc::new(PostgresAuthorizationRepository::new(pool.clone()));
    let security_admin_repository = Arc::new(PostgresSecurityAdminRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresPermissionAuditRepository::new(pool));

    let authorization = AuthorizationService::new(
        authorization_repository,
        ScopeResolver::new(metadata_provider, config.metadata_lookup_timeout),
        AuditLogger::new(audit_repository, config.evaluation_timeout),
        Arc::new(SystemClock),
        config,
    );
    let admin = SecurityAdminService::new(authorization.clone(), security_admin_repository);

    AdminServices {
        authorization,
        admin,
    }
}
