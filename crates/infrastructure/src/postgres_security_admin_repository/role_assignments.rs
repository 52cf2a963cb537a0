use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn insert_role_assignment_impl(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let (scope_type, scope_id) = scope_columns(&assignment.scope);
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        // Lapsed rows still hold the partial unique index until deactivated.
        sqlx::query(
            r#"
            UPDATE role_assignments
            SET is_active = false,
                revoked_by = $5,
                revoked_at = $4
            WHERE user_id = $1
                AND scope_type = $2
                AND scope_id IS NOT DISTINCT FROM $3
                AND is_active
                AND expires_at IS NOT NULL
                AND expires_at <= $4
            "#,
        )
        .bind(assignment.user_id.as_str())
        .bind(scope_type)
        .bind(scope_id)
        .bind(as_of)
        .bind(assignment.granted_by.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate lapsed assignments: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO role_assignments (
                assignment_id,
                user_id,
                role,
                scope_type,
                scope_id,
                granted_by,
                granted_at,
                expires_at,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true)
            "#,
        )
        .bind(assignment.assignment_id)
        .bind(assignment.user_id.as_str())
        .bind(assignment.role.as_str())
        .bind(scope_type)
        .bind(scope_id)
        .bind(assignment.granted_by.as_str())
        .bind(assignment.granted_at)
        .bind(assignment.expires_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!(
                    "principal '{}' already holds an effective assignment at {}",
                    assignment.user_id, assignment.scope
                ),
            )
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    pub(super) async fn insert_bootstrap_assignment_impl(
        &self,
        assignment: &RoleAssignment,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(BOOTSTRAP_LOCK_KEY)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to acquire bootstrap lock: {error}"))
            })?;

        let system_exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM role_assignments
                WHERE role = 'system'
                    AND is_active
                    AND (expires_at IS NULL OR expires_at > $1)
            )
            "#,
        )
        .bind(as_of)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to check for system principals: {error}"))
        })?;

        if system_exists {
            return Err(AppError::Conflict(
                "a system principal has already been bootstrapped".to_owned(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO role_assignments (
                assignment_id,
                user_id,
                role,
                scope_type,
                scope_id,
                granted_by,
                granted_at,
                expires_at,
                is_active
            )
            VALUES ($1, $2, 'system', 'global', NULL, $3, $4, NULL, true)
            "#,
        )
        .bind(assignment.assignment_id)
        .bind(assignment.user_id.as_str())
        .bind(assignment.granted_by.as_str())
        .bind(assignment.granted_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!(
                    "principal '{}' already holds a global assignment",
                    assignment.user_id
                ),
            )
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    pub(super) async fn find_role_assignment_impl(
        &self,
        assignment_id: Uuid,
    ) -> AppResult<Option<RoleAssignment>> {
        let sql = format!(
            "SELECT {ROLE_ASSIGNMENT_COLUMNS} FROM role_assignments WHERE assignment_id = $1"
        );
        sqlx::query_as::<_, RoleAssignmentRow>(&sql)
            .bind(assignment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to find role assignment '{assignment_id}': {error}"
                ))
            })?
            .map(RoleAssignmentRow::into_assignment)
            .transpose()
    }

    pub(super) async fn deactivate_role_assignment_impl(
        &self,
        assignment_id: Uuid,
        revoked_by: &str,
        revoked_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE role_assignments
            SET is_active = false,
                revoked_by = $2,
                revoked_at = $3
            WHERE assignment_id = $1
                AND is_active
            "#,
        )
        .bind(assignment_id)
        .bind(revoked_by)
        .bind(revoked_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to revoke role assignment '{assignment_id}': {error}"
            ))
        })?;

        Ok(())
    }

    pub(super) async fn list_role_assignments_impl(
        &self,
        query: &RoleAssignmentQuery,
    ) -> AppResult<Vec<RoleAssignment>> {
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
            SELECT {ROLE_ASSIGNMENT_COLUMNS}
            FROM role_assignments
            WHERE ($1::TEXT IS NULL OR user_id = $1)
                AND ($2::TEXT IS NULL OR (scope_type = $2 AND scope_id IS NOT DISTINCT FROM $3))
                AND ($4::TIMESTAMPTZ IS NULL OR (is_active AND (expires_at IS NULL OR expires_at > $4)))
            ORDER BY granted_at, assignment_id
            LIMIT $5
            OFFSET $6
            "#
        );
        sqlx::query_as::<_, RoleAssignmentRow>(&sql)
            .bind(query.user_id.as_deref())
            .bind(scope_type)
            .bind(scope_id)
            .bind(query.effective_at)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list role assignments: {error}"))
            })?
            .into_iter()
            .map(RoleAssignmentRow::into_assignment)
            .collect()
    }
}
