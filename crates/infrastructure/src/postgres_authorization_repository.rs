use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use gatehouse_application::AuthorizationRepository;
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{GrantSnapshot, ScopeChain};

use crate::postgres_grant_rows::{
    ACCESS_REQUEST_COLUMNS, AccessRequestRow, DELEGATION_COLUMNS, DelegationRow,
    ROLE_ASSIGNMENT_COLUMNS, RoleAssignmentRow, scope_columns,
};

/// PostgreSQL-backed repository for per-evaluation grant snapshots.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Parallel arrays of `(scope_type, COALESCE(scope_id, ''))` for `UNNEST`.
fn chain_arrays(chain: &ScopeChain) -> (Vec<String>, Vec<String>) {
    chain
        .scopes()
        .iter()
        .map(|scope| {
            let (scope_type, scope_id) = scope_columns(scope);
            (scope_type.to_owned(), scope_id.unwrap_or_default().to_owned())
        })
        .unzip()
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn load_grant_snapshot(
        &self,
        principal: &str,
        chain: &ScopeChain,
        as_of: DateTime<Utc>,
    ) -> AppResult<GrantSnapshot> {
        let (scope_types, scope_ids) = chain_arrays(chain);

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin snapshot transaction: {error}"))
        })?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to set snapshot isolation: {error}"))
            })?;

        let snapshot =
            load_snapshot(&mut transaction, principal, &scope_types, &scope_ids, as_of).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to close snapshot transaction: {error}"))
        })?;

        Ok(snapshot)
    }
}

async fn load_snapshot(
    transaction: &mut Transaction<'_, Postgres>,
    principal: &str,
    scope_types: &[String],
    scope_ids: &[String],
    as_of: DateTime<Utc>,
) -> AppResult<GrantSnapshot> {
    let assignments_sql = format!(
        r#"
        SELECT {ROLE_ASSIGNMENT_COLUMNS}
        FROM role_assignments
        WHERE user_id = $1
            AND is_active
            AND (expires_at IS NULL OR expires_at > $4)
            AND (scope_type, COALESCE(scope_id, '')) IN (
                SELECT chain.scope_type, chain.scope_id
                FROM UNNEST($2::TEXT[], $3::TEXT[]) AS chain(scope_type, scope_id)
            )
        "#
    );
    let assignments = sqlx::query_as::<_, RoleAssignmentRow>(&assignments_sql)
        .bind(principal)
        .bind(scope_types)
        .bind(scope_ids)
        .bind(as_of)
        .fetch_all(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load role assignments for '{principal}': {error}"
            ))
        })?
        .into_iter()
        .map(RoleAssignmentRow::into_assignment)
        .collect::<AppResult<Vec<_>>>()?;

    let delegations_sql = format!(
        r#"
        SELECT {DELEGATION_COLUMNS}
        FROM permission_delegations
        WHERE delegate_id = $1
            AND is_active
            AND expires_at > $4
            AND (scope_type, COALESCE(scope_id, '')) IN (
                SELECT chain.scope_type, chain.scope_id
                FROM UNNEST($2::TEXT[], $3::TEXT[]) AS chain(scope_type, scope_id)
            )
        "#
    );
    let delegations = sqlx::query_as::<_, DelegationRow>(&delegations_sql)
        .bind(principal)
        .bind(scope_types)
        .bind(scope_ids)
        .bind(as_of)
        .fetch_all(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load delegations for '{principal}': {error}"
            ))
        })?
        .into_iter()
        .map(DelegationRow::into_delegation)
        .collect::<AppResult<Vec<_>>>()?;

    let access_requests_sql = format!(
        r#"
        SELECT {ACCESS_REQUEST_COLUMNS}
        FROM access_requests
        WHERE requester_id = $1
            AND status = 'approved'
            AND expires_at > $4
            AND (scope_type, COALESCE(scope_id, '')) IN (
                SELECT chain.scope_type, chain.scope_id
                FROM UNNEST($2::TEXT[], $3::TEXT[]) AS chain(scope_type, scope_id)
            )
        "#
    );
    let access_requests = sqlx::query_as::<_, AccessRequestRow>(&access_requests_sql)
        .bind(principal)
        .bind(scope_types)
        .bind(scope_ids)
        .bind(as_of)
        .fetch_all(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load approved access requests for '{principal}': {error}"
            ))
        })?
        .into_iter()
        .map(AccessRequestRow::into_access_request)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(GrantSnapshot {
        assignments,
        delegations,
        access_requests,
    })
}
