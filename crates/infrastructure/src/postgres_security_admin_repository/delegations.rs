use gatehouse_domain::Action;

use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn insert_delegation_impl(
        &self,
        delegation: &PermissionDelegation,
    ) -> AppResult<()> {
        let (scope_type, scope_id) = scope_columns(&delegation.scope);
        let actions: Vec<&str> = delegation.actions.iter().map(Action::as_str).collect();

        sqlx::query(
            r#"
            INSERT INTO permission_delegations (
                delegation_id,
                delegator_id,
                delegate_id,
                resource,
                actions,
                resource_id,
                scope_type,
                scope_id,
                granted_at,
                expires_at,
                is_active,
                reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, true, $11)
            "#,
        )
        .bind(delegation.delegation_id)
        .bind(delegation.delegator_id.as_str())
        .bind(delegation.delegate_id.as_str())
        .bind(delegation.resource.as_str())
        .bind(actions)
        .bind(delegation.resource_id.as_deref())
        .bind(scope_type)
        .bind(scope_id)
        .bind(delegation.granted_at)
        .bind(delegation.expires_at)
        .bind(delegation.reason.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!("delegation '{}' already exists", delegation.delegation_id),
            )
        })?;

        Ok(())
    }

    pub(super) async fn find_delegation_impl(
        &self,
        delegation_id: Uuid,
    ) -> AppResult<Option<PermissionDelegation>> {
        let sql = format!(
            "SELECT {DELEGATION_COLUMNS} FROM permission_delegations WHERE delegation_id = $1"
        );
        sqlx::query_as::<_, DelegationRow>(&sql)
            .bind(delegation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to find delegation '{delegation_id}': {error}"
                ))
            })?
            .map(DelegationRow::into_delegation)
            .transpose()
    }

    pub(super) async fn deactivate_delegation_impl(
        &self,
        delegation_id: Uuid,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE permission_delegations
            SET is_active = false,
                revoked_by = $2,
                revoked_at = $3
            WHERE delegation_id = $1
                AND is_active
            "#,
        )
        .bind(delegation_id)
        .bind(revoked_by)
        .bind(revoked_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to revoke delegation '{delegation_id}': {error}"
            ))
        })?;

        Ok(())
    }

    pub(super) async fn list_delegations_impl(
        &self,
        query: &DelegationQuery,
    ) -> AppResult<Vec<PermissionDelegation>> {
        let (scope_type, scope_id) = match &query.scope {
            Some(scope) => {
                let (scope_type, scope_id) = scope_columns(scope);
                (Some(scope_type), scope_id)
            }
            None => (None, None),
        };
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let sql = format!(
            r#"
            SELECT {DELEGATION_COLUMNS}
            FROM permission_delegations
            WHERE ($1::TEXT IS NULL OR delegator_id = $1)
                AND ($2::TEXT IS NULL OR delegate_id = $2)
                AND ($3::TEXT IS NULL OR (scope_type = $3 AND scope_id IS NOT DISTINCT FROM $4))
                AND ($5::TIMESTAMPTZ IS NULL OR (is_active AND expires_at > $5))
            ORDER BY granted_at, delegation_id
            LIMIT $6
            OFFSET $7
            "#
        );
        sqlx::query_as::<_, DelegationRow>(&sql)
            .bind(query.delegator_id.as_deref())
            .bind(query.delegate_id.as_deref())
            .bind(scope_type)
            .bind(scope_id)
            .bind(query.effective_at)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list delegations: {error}")))?
            .into_iter()
            .map(DelegationRow::into_delegation)
            .collect()
    }
}
