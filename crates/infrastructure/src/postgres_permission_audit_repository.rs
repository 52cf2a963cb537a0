use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use gatehouse_application::{AuditStreamQuery, PermissionAuditRepository};
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{
    AUDIT_GENESIS_HASH, Action, AuditId, PermissionAuditEntry, PermissionAuditRecord,
    ResourceKind, ScopeType, audit_record_digest,
};


/// Advisory lock key that keeps the audit hash chain linear.
const AUDIT_CHAIN_LOCK_KEY: i64 = 0x6761_7465_0002;

/// PostgreSQL-backed append-only permission audit log.
#[derive(Clone)]
pub struct PostgresPermissionAuditRepository {
    pool: PgPool,
}

impl PostgresPermissionAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionAuditRow {
    sequence: i64,
    audit_id: Uuid,
    request_id: Uuid,
    user_id: String,
    action: String,
    resource: String,
    resource_id: Option<String>,
    scope_type: String,
    scope_id: Option<String>,
    allowed: bool,
    recorded_at: DateTime<Utc>,
    request_metadata: Value,
    previous_hash: String,
    record_hash: String,
}

impl PermissionAuditRow {
    fn into_record(self) -> AppResult<PermissionAuditRecord> {
        let action = Action::from_str(&self.action).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode audit action '{}' at sequence {}: {error}",
                self.action, self.sequence
            ))
        })?;
        let resource = ResourceKind::from_str(&self.resource).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode audit resource '{}' at sequence {}: {error}",
                self.resource, self.sequence
            ))
        })?;
        let scope_type = ScopeType::from_str(&self.scope_type).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode audit scope type '{}' at sequence {}: {error}",
                self.scope_type, self.sequence
            ))
        })?;

        Ok(PermissionAuditRecord {
            sequence: self.sequence,
            entry: PermissionAuditEntry {
                audit_id: AuditId::from_uuid(self.audit_id),
                request_id: self.request_id,
                user_id: self.user_id,
                action,
                resource,
                resource_id: self.resource_id,
                scope_type,
                scope_id: self.scope_id,
                allowed: self.allowed,
                timestamp: self.recorded_at,
                request_metadata: self.request_metadata,
            },
            previous_hash: self.previous_hash,
            record_hash: self.record_hash,
        })
    }
}

#[async_trait]
impl PermissionAuditRepository for PostgresPermissionAuditRepository {
    async fn append_audit(&self, entry: &PermissionAuditEntry) -> AppResult<bool> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(AUDIT_CHAIN_LOCK_KEY)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to acquire audit chain lock: {error}"))
            })?;

        let already_recorded = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM permission_audits WHERE audit_id = $1)",
        )
        .bind(entry.audit_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to check audit record presence: {error}"))
        })?;

        if already_recorded {
            return Ok(false);
        }

        let previous_hash = sqlx::query_scalar::<_, String>(
            r#"
            SELECT record_hash
            FROM permission_audits
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read audit chain head: {error}")))?
        .unwrap_or_else(|| AUDIT_GENESIS_HASH.to_owned());
        let record_hash = audit_record_digest(&previous_hash, entry);

        let inserted = sqlx::query(
            r#"
            INSERT INTO permission_audits (
                audit_id,
                request_id,
                user_id,
                action,
                resource,
                resource_id,
                scope_type,
                scope_id,
                allowed,
                recorded_at,
                request_metadata,
                previous_hash,
                record_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (audit_id) DO NOTHING
            "#,
        )
        .bind(entry.audit_id.as_uuid())
        .bind(entry.request_id)
        .bind(entry.user_id.as_str())
        .bind(entry.action.as_str())
        .bind(entry.resource.as_str())
        .bind(entry.resource_id.as_deref())
        .bind(entry.scope_type.as_str())
        .bind(entry.scope_id.as_deref())
        .bind(entry.allowed)
        .bind(entry.timestamp)
        .bind(&entry.request_metadata)
        .bind(previous_hash.as_str())
        .bind(record_hash.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(map_append_error)?
        .rows_affected();

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(inserted == 1)
    }

    async fn list_audits(&self, query: &AuditStreamQuery) -> AppResult<Vec<PermissionAuditRecord>> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, PermissionAuditRow>(
            r#"
            SELECT
                sequence,
                audit_id,
                request_id,
                user_id,
                action,
                resource,
                resource_id,
                scope_type,
                scope_id,
                allowed,
                recorded_at,
                request_metadata,
                previous_hash,
                record_hash
            FROM permission_audits
            WHERE sequence > $1
                AND ($2::TEXT IS NULL OR user_id = $2)
                AND ($3::BOOLEAN IS NULL OR allowed = $3)
            ORDER BY sequence
            LIMIT $4
            "#,
        )
        .bind(query.after_sequence)
        .bind(query.user_id.as_deref())
        .bind(query.allowed)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit records: {error}")))?;

        rows.into_iter()
            .map(PermissionAuditRow::into_record)
            .collect()
    }
}

/// Data exceptions (SQLSTATE class 22) mean the row content itself is
/// unstorable and are reported as `Validation` so the logger stops retrying.
fn map_append_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error
            .code()
            .is_some_and(|code| code.starts_with("22"))
    {
        return AppError::Validation(format!("audit record rejected by store: {error}"));
    }

    AppError::Internal(format!("failed to append audit record: {error}"))
}
