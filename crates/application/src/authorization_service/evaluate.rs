use std::future::Future;

use chrono::{DateTime, Utc};
use gatehouse_core::{AppError, AppResult, PrincipalId};
use gatehouse_domain::{
    Action, AuditId, Decision, EvaluationFault, GrantRef, PermissionAuditEntry, RequestContext,
    ResolutionMode, ResourceKind, ResourceRef, Scope, ScopeChain, ScopeType,
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::AuthorizationService;

type Outcome = Result<(ScopeChain, Option<GrantRef>), EvaluationFault>;

/// What one evaluation is about, including the scope written to the audit row
/// when resolution never produced a chain.
struct EvaluationTarget<'a> {
    principal: &'a str,
    action: Action,
    resource: ResourceRef,
    scope_type: ScopeType,
    scope_id: Option<String>,
    fallback_scope: Scope,
}

impl AuthorizationService {
    /// Decides whether the principal may perform the action on the resource.
    ///
    /// Never fails: internal faults deny with `fault` set. Exactly one audit
    /// entry is recorded before the decision is returned.
    pub async fn evaluate(
        &self,
        principal: &PrincipalId,
        action: Action,
        resource: &ResourceRef,
        context: &RequestContext,
    ) -> Decision {
        let now = self.clock.now();
        let outcome = self
            .bounded(async {
                let chain = self
                    .scope_resolver
                    .resolve_chain(resource)
                    .await
                    .map_err(fault_from_error)?;
                self.resolve_in_chain(principal.as_str(), action, resource, chain, now)
                    .await
            })
            .await;

        let target = EvaluationTarget {
            principal: principal.as_str(),
            action,
            resource: resource.clone(),
            scope_type: ScopeType::Global,
            scope_id: None,
            fallback_scope: Scope::Global,
        };
        self.conclude(target, outcome, now, context).await
    }

    /// Decides whether the principal may perform the action on an explicitly named scope.
    ///
    /// A malformed scope is denied with `EvaluationFault::MalformedScope` and
    /// audited with the scope parts exactly as supplied.
    pub async fn evaluate_at_scope(
        &self,
        principal: &PrincipalId,
        action: Action,
        scope_type: ScopeType,
        scope_id: Option<&str>,
        context: &RequestContext,
    ) -> Decision {
        let now = self.clock.now();

        let (resource, fallback_scope, outcome) = match Scope::from_parts(scope_type, scope_id) {
            Ok(scope) => {
                let resource = ResourceRef::for_scope(&scope);
                let outcome = self
                    .bounded(async {
                        let chain = self
                            .scope_resolver
                            .resolve_scope_chain(&scope)
                            .await
                            .map_err(fault_from_error)?;
                        self.resolve_in_chain(principal.as_str(), action, &resource, chain, now)
                            .await
                    })
                    .await;
                (resource, scope, outcome)
            }
            Err(error) => (
                raw_scope_resource(scope_type, scope_id),
                Scope::Global,
                Err(fault_from_error(error)),
            ),
        };

        let target = EvaluationTarget {
            principal: principal.as_str(),
            action,
            resource,
            scope_type,
            scope_id: scope_id.map(str::to_owned),
            fallback_scope,
        };
        self.conclude(target, outcome, now, context).await
    }

    /// Evaluates and converts a deny into an error.
    pub async fn require(
        &self,
        principal: &PrincipalId,
        action: Action,
        resource: &ResourceRef,
        context: &RequestContext,
    ) -> AppResult<Decision> {
        let decision = self.evaluate(principal, action, resource, context).await;
        decision_into_result(principal, action, &resource.to_string(), decision)
    }

    /// Evaluates at a named scope and converts a deny into an error.
    pub async fn require_at_scope(
        &self,
        principal: &PrincipalId,
        action: Action,
        scope_type: ScopeType,
        scope_id: Option<&str>,
        context: &RequestContext,
    ) -> AppResult<Decision> {
        let decision = self
            .evaluate_at_scope(principal, action, scope_type, scope_id, context)
            .await;
        let target = match scope_id {
            Some(scope_id) => format!("{scope_type}:{scope_id}"),
            None => scope_type.to_string(),
        };
        decision_into_result(principal, action, &target, decision)
    }

    async fn bounded<F>(&self, evaluation: F) -> Outcome
    where
        F: Future<Output = Outcome>,
    {
        tokio::time::timeout(self.config.evaluation_timeout, evaluation)
            .await
            .unwrap_or_else(|_| Err(EvaluationFault::Timeout))
    }

    async fn resolve_in_chain(
        &self,
        principal: &str,
        action: Action,
        resource: &ResourceRef,
        chain: ScopeChain,
        now: DateTime<Utc>,
    ) -> Outcome {
        let snapshot = self
            .repository
            .load_grant_snapshot(principal, &chain, now)
            .await
            .map_err(|error| {
                warn!(principal, error = %error, "failed to load grant snapshot");
                EvaluationFault::Storage(error.code().to_owned())
            })?;

        let grant = snapshot.resolve(principal, action, resource, &chain, now, ResolutionMode::Full);
        Ok((chain, grant))
    }

    async fn conclude(
        &self,
        target: EvaluationTarget<'_>,
        outcome: Outcome,
        now: DateTime<Utc>,
        context: &RequestContext,
    ) -> Decision {
        let audit_id = AuditId::new();
        let (decision, scope_type, scope_id) = match outcome {
            Ok((chain, grant)) => {
                let scope = chain.most_specific().clone();
                let scope_type = scope.scope_type();
                let scope_id = scope.scope_id().map(str::to_owned);
                let decision = match grant {
                    Some(grant) => Decision::granted(grant, scope, audit_id),
                    None => Decision::denied(scope, audit_id),
                };
                (decision, scope_type, scope_id)
            }
            Err(fault) => (
                Decision::faulted(fault, target.fallback_scope, audit_id),
                target.scope_type,
                target.scope_id,
            ),
        };

        debug!(
            principal = target.principal,
            action = %target.action,
            resource = %target.resource,
            scope = %decision.evaluated_scope,
            allowed = decision.allowed,
            matched_via = decision.matched_via.as_ref().map(GrantRef::kind),
            fault = decision.fault.as_ref().map(EvaluationFault::code),
            "permission evaluated"
        );

        let entry = PermissionAuditEntry::new(
            audit_id,
            context.request_id,
            target.principal,
            target.action,
            target.resource.kind,
            target.resource.id,
            scope_type,
            scope_id,
            decision.allowed,
            now,
            decision_metadata(context, &decision),
        );
        self.audit_logger.record(entry).await;

        decision
    }
}

/// Converts a deny into the matching error for callers that need a `Result`.
fn decision_into_result(
    principal: &PrincipalId,
    action: Action,
    target: &str,
    decision: Decision,
) -> AppResult<Decision> {
    if decision.allowed {
        return Ok(decision);
    }

    Err(match decision.fault {
        Some(EvaluationFault::MalformedScope(message)) => AppError::MalformedScope(message),
        Some(EvaluationFault::MetadataUnavailable(message)) => {
            AppError::MetadataUnavailable(message)
        }
        Some(EvaluationFault::Timeout) => {
            AppError::Internal("permission evaluation timed out".to_owned())
        }
        Some(EvaluationFault::Storage(_)) => {
            AppError::Internal("permission evaluation failed".to_owned())
        }
        Some(EvaluationFault::InvalidResource(message)) => AppError::Validation(message),
        None => AppError::Forbidden(format!(
            "principal '{principal}' may not {action} {target}"
        )),
    })
}

fn fault_from_error(error: AppError) -> EvaluationFault {
    match error {
        AppError::MalformedScope(message) => EvaluationFault::MalformedScope(message),
        AppError::MetadataUnavailable(message) => EvaluationFault::MetadataUnavailable(message),
        AppError::Validation(message) => EvaluationFault::InvalidResource(message),
        other => EvaluationFault::Storage(other.code().to_owned()),
    }
}

/// Returns the resource standing for a scope given as raw, possibly malformed, parts.
pub(crate) fn raw_scope_resource(scope_type: ScopeType, scope_id: Option<&str>) -> ResourceRef {
    let kind = match scope_type {
        ScopeType::Global | ScopeType::Org => ResourceKind::Organization,
        ScopeType::Team => ResourceKind::Team,
        ScopeType::Context => ResourceKind::Context,
    };
    ResourceRef {
        kind,
        id: scope_id.map(str::to_owned),
    }
}

fn decision_metadata(context: &RequestContext, decision: &Decision) -> Value {
    json!({
        "request": context.metadata,
        "matched_via": decision.matched_via,
        "fault": decision.fault.as_ref().map(EvaluationFault::code),
    })
}
