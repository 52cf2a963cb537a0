use chrono::SubsecRound;
use tracing::info;
use uuid::Uuid;

use gatehouse_core::{AppError, AppResult, NonEmptyString, PrincipalId};
use gatehouse_domain::{Action, PermissionDelegation, RequestContext, ResourceRef, Scope};

use crate::security_admin_ports::{CreateDelegationInput, DelegationQuery};

use super::{SecurityAdminService, clamp_limit, optional_resource_id};

impl SecurityAdminService {
    /// Delegates a set of actions the actor personally holds to another principal.
    ///
    /// Held rights are read from assignments only, so received delegations
    /// can never be passed on.
    pub async fn create_delegation(
        &self,
        actor: &PrincipalId,
        input: CreateDelegationInput,
        context: &RequestContext,
    ) -> AppResult<PermissionDelegation> {
        const OPERATION: &str = "create_delegation";

        let scope = self
            .require_administer(
                actor,
                input.scope_type,
                input.scope_id.as_deref(),
                OPERATION,
                context,
            )
            .await?;

        let result = self.insert_delegation(actor, scope.clone(), input).await;
        self.finish(actor, &scope, OPERATION, context, result).await
    }

    /// Revokes a delegation early. Idempotent.
    ///
    /// The delegator may always revoke; anyone else needs `administer` at the
    /// delegation's scope.
    pub async fn revoke_delegation(
        &self,
        actor: &PrincipalId,
        delegation_id: Uuid,
        context: &RequestContext,
    ) -> AppResult<()> {
        const OPERATION: &str = "revoke_delegation";

        let lookup = self
            .repository
            .find_delegation(delegation_id)
            .await
            .and_then(|delegation| {
                delegation.ok_or_else(|| {
                    AppError::NotFound(format!("delegation '{delegation_id}' does not exist"))
                })
            });
        let delegation = self
            .finish(actor, &Scope::Global, OPERATION, context, lookup)
            .await?;

        if delegation.delegator_id == actor.as_str() {
            let context = context.clone().with_field("revoked_as", "delegator");
            self.record_administer_outcome(
                actor,
                delegation.scope.scope_type(),
                delegation.scope.scope_id().map(str::to_owned),
                OPERATION,
                None,
                &context,
            )
            .await;
        } else {
            self.require_administer(
                actor,
                delegation.scope.scope_type(),
                delegation.scope.scope_id(),
                OPERATION,
                context,
            )
            .await?;
        }

        let revoked_at = self.authorization_service.clock().now();
        let result = self
            .repository
            .deactivate_delegation(delegation_id, actor.as_str(), revoked_at)
            .await;
        if result.is_ok() {
            info!(actor = %actor, delegation_id = %delegation_id, "delegation revoked");
        }
        self.finish(actor, &delegation.scope, OPERATION, context, result)
            .await
    }

    /// Lists delegations.
    ///
    /// Listing delegations the actor gave or received is always allowed.
    pub async fn list_delegations(
        &self,
        actor: &PrincipalId,
        query: DelegationQuery,
        context: &RequestContext,
    ) -> AppResult<Vec<PermissionDelegation>> {
        let own_rows = query.delegator_id.as_deref() == Some(actor.as_str())
            || query.delegate_id.as_deref() == Some(actor.as_str());
        self.require_listing(
            actor,
            own_rows,
            query.scope.as_ref(),
            "list_delegations",
            context,
        )
        .await?;

        self.repository
            .list_delegations(&DelegationQuery {
                limit: clamp_limit(query.limit),
                ..query
            })
            .await
    }

    async fn insert_delegation(
        &self,
        actor: &PrincipalId,
        scope: Scope,
        input: CreateDelegationInput,
    ) -> AppResult<PermissionDelegation> {
        if input.actions.is_empty() {
            return Err(AppError::Validation(
                "delegation must cover at least one action".to_owned(),
            ));
        }

        let delegate = PrincipalId::new(input.delegate_id)?;
        if &delegate == actor {
            return Err(AppError::Validation(
                "principals cannot delegate to themselves".to_owned(),
            ));
        }
        let reason = NonEmptyString::new(input.reason)?;
        let resource_id = optional_resource_id(input.resource_id)?;

        let held = self
            .authorization_service
            .held_rights(actor.as_str(), &scope)
            .await?;
        let now = held.as_of();

        if input.expires_at <= now {
            return Err(AppError::Validation(
                "delegation expiry must be in the future".to_owned(),
            ));
        }
        let max_ttl = self.authorization_service.config().max_delegation_ttl;
        if input.expires_at > now + max_ttl {
            return Err(AppError::Validation(format!(
                "delegation expiry must be within {} hours",
                max_ttl.num_hours()
            )));
        }

        let resource = ResourceRef {
            kind: input.resource,
            id: resource_id.clone(),
        };
        let missing: Vec<&str> = input
            .actions
            .iter()
            .filter(|action| !held.permits(**action, &resource))
            .map(Action::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::InsufficientRights(format!(
                "principal '{actor}' does not hold [{}] on {resource} at {scope}",
                missing.join(", ")
            )));
        }

        let delegation = PermissionDelegation {
            delegation_id: Uuid::new_v4(),
            delegator_id: actor.to_string(),
            delegate_id: delegate.into(),
            resource: input.resource,
            actions: input.actions,
            resource_id,
            scope,
            granted_at: now,
            expires_at: input.expires_at.trunc_subsecs(6),
            is_active: true,
            reason: reason.into(),
            revoked_by: None,
            revoked_at: None,
        };
        self.repository.insert_delegation(&delegation).await?;

        info!(
            actor = %actor,
            delegate_id = %delegation.delegate_id,
            resource = %delegation.resource,
            scope = %delegation.scope,
            expires_at = %delegation.expires_at,
            "delegation created"
        );
        Ok(delegation)
    }
}
