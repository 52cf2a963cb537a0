use std::sync::Arc;

use gatehouse_core::{AppError, AppResult, PrincipalId};
use gatehouse_domain::{
    Action, AuditId, PermissionAuditEntry, RequestContext, Scope, ScopeType,
};
use serde_json::json;
use tracing::info;

use crate::authorization_service::raw_scope_resource;
use crate::{AuthorizationService, SecurityAdminRepository};

mod access_requests;
mod audit_stream;
mod bootstrap;
mod delegations;
mod role_assignments;

const MAX_LIST_LIMIT: usize = 1000;

/// Application service for role assignments, delegations and access requests.
///
/// Every mutation is gated by an `administer` evaluation on its target scope.
/// A mutation that fails after passing the gate is recorded as an additional
/// denied `administer` audit entry carrying the error code.
#[derive(Clone)]
pub struct SecurityAdminService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn SecurityAdminRepository>,
}

impl SecurityAdminService {
    /// Creates a new security admin service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn SecurityAdminRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
        }
    }

    async fn require_administer(
        &self,
        actor: &PrincipalId,
        scope_type: ScopeType,
        scope_id: Option<&str>,
        operation: &'static str,
        context: &RequestContext,
    ) -> AppResult<Scope> {
        let context = context.clone().with_field("operation", operation);
        let decision = self
            .authorization_service
            .require_at_scope(actor, Action::Administer, scope_type, scope_id, &context)
            .await?;
        Ok(decision.evaluated_scope)
    }

    async fn require_listing(
        &self,
        actor: &PrincipalId,
        own_rows: bool,
        scope: Option<&Scope>,
        operation: &'static str,
        context: &RequestContext,
    ) -> AppResult<()> {
        if own_rows {
            return Ok(());
        }

        let scope = scope.cloned().unwrap_or(Scope::Global);
        self.require_administer(actor, scope.scope_type(), scope.scope_id(), operation, context)
            .await
            .map(|_| ())
    }

    /// Audits the result of a gated mutation and passes it through.
    async fn finish<T>(
        &self,
        actor: &PrincipalId,
        scope: &Scope,
        operation: &'static str,
        context: &RequestContext,
        result: AppResult<T>,
    ) -> AppResult<T> {
        if let Err(error) = &result {
            info!(
                actor = %actor,
                scope = %scope,
                operation,
                error = error.code(),
                "security mutation rejected"
            );
            self.record_administer_outcome(
                actor,
                scope.scope_type(),
                scope.scope_id().map(str::to_owned),
                operation,
                Some(error),
                context,
            )
            .await;
        }

        result
    }

    async fn record_administer_outcome(
        &self,
        actor: &PrincipalId,
        scope_type: ScopeType,
        scope_id: Option<String>,
        operation: &'static str,
        error: Option<&AppError>,
        context: &RequestContext,
    ) -> AuditId {
        let resource = raw_scope_resource(scope_type, scope_id.as_deref());
        let entry = PermissionAuditEntry::new(
            AuditId::new(),
            context.request_id,
            actor.as_str(),
            Action::Administer,
            resource.kind,
            resource.id,
            scope_type,
            scope_id,
            error.is_none(),
            self.authorization_service.clock().now(),
            json!({
                "request": context.metadata,
                "operation": operation,
                "error": error.map(AppError::code),
            }),
        );

        self.authorization_service
            .audit_logger()
            .record(entry)
            .await
    }
}

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIST_LIMIT)
}

fn optional_resource_id(resource_id: Option<String>) -> AppResult<Option<String>> {
    match resource_id {
        Some(value) if value.trim().is_empty() => Err(AppError::Validation(
            "resource_id must be omitted or non-empty".to_owned(),
        )),
        Some(value) => Ok(Some(value.trim().to_owned())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests;
