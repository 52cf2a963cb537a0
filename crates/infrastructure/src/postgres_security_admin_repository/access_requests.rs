use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn insert_access_request_impl(&self, request: &AccessRequest) -> AppResult<()> {
        let (scope_type, scope_id) = scope_columns(&request.scope);

        sqlx::query(
            r#"
            INSERT INTO access_requests (
                request_id,
                requester_id,
                resource,
                action,
                resource_id,
                scope_type,
                scope_id,
                justification,
                requested_at,
                status,
                expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(request.request_id)
        .bind(request.requester_id.as_str())
        .bind(request.resource.as_str())
        .bind(request.action.as_str())
        .bind(request.resource_id.as_deref())
        .bind(scope_type)
        .bind(scope_id)
        .bind(request.justification.as_str())
        .bind(request.requested_at)
        .bind(request.status.as_str())
        .bind(request.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!("access request '{}' already exists", request.request_id),
            )
        })?;

        Ok(())
    }

    pub(super) async fn find_access_request_impl(
        &self,
        request_id: Uuid,
    ) -> AppResult<Option<AccessRequest>> {
        let sql =
            format!("SELECT {ACCESS_REQUEST_COLUMNS} FROM access_requests WHERE request_id = $1");
        sqlx::query_as::<_, AccessRequestRow>(&sql)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to find access request '{request_id}': {error}"
                ))
            })?
            .map(AccessRequestRow::into_access_request)
            .transpose()
    }

    pub(super) async fn apply_review_transition_impl(
        &self,
        request_id: Uuid,
        transition: &ReviewTransition,
    ) -> AppResult<Option<AccessRequest>> {
        let sql = format!(
            r#"
            UPDATE access_requests
            SET status = $2,
                reviewed_by = $3,
                reviewed_at = $4,
                review_reason = $5
            WHERE request_id = $1
                AND status = 'pending'
                AND expires_at > $4
            RETURNING {ACCESS_REQUEST_COLUMNS}
            "#
        );
        sqlx::query_as::<_, AccessRequestRow>(&sql)
            .bind(request_id)
            .bind(transition.status.as_str())
            .bind(transition.reviewed_by.as_str())
            .bind(transition.reviewed_at)
            .bind(transition.review_reason.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to review access request '{request_id}': {error}"
                ))
            })?
            .map(AccessRequestRow::into_access_request)
            .transpose()
    }

    pub(super) async fn list_access_requests_impl(
        &self,
        query: &AccessRequestQuery,
    ) -> AppResult<Vec<AccessRequest>> {
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
            SELECT {ACCESS_REQUEST_COLUMNS}
            FROM access_requests
            WHERE ($1::TEXT IS NULL OR requester_id = $1)
                AND ($2::TEXT IS NULL OR (scope_type = $2 AND scope_id IS NOT DISTINCT FROM $3))
                AND (
                    $4::TEXT IS NULL
                    OR CASE
                        WHEN status = 'rejected' THEN 'rejected'
                        WHEN expires_at <= $5 THEN 'expired'
                        ELSE status
                    END = $4
                )
            ORDER BY requested_at, request_id
            LIMIT $6
            OFFSET $7
            "#
        );
        sqlx::query_as::<_, AccessRequestRow>(&sql)
            .bind(query.requester_id.as_deref())
            .bind(scope_type)
            .bind(scope_id)
            .bind(query.status.map(|status| status.as_str()))
            .bind(query.as_of)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list access requests: {error}"))
            })?
            .into_iter()
            .map(AccessRequestRow::into_access_request)
            .collect()
    }
}
