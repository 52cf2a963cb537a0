use chrono::SubsecRound;
use tracing::info;
use uuid::Uuid;

use gatehouse_core::{AppError, AppResult, PrincipalId};
use gatehouse_domain::{RequestContext, Role, RoleAssignment, Scope};

use crate::security_admin_ports::{CreateRoleAssignmentInput, RoleAssignmentQuery};

use super::{SecurityAdminService, clamp_limit};

impl SecurityAdminService {
    /// Grants a role to a principal at a scope.
    ///
    /// The actor's own effective role at the scope must be at least the
    /// granted role, and only SYSTEM may grant SYSTEM.
    pub async fn create_role_assignment(
        &self,
        actor: &PrincipalId,
        input: CreateRoleAssignmentInput,
        context: &RequestContext,
    ) -> AppResult<RoleAssignment> {
        const OPERATION: &str = "create_role_assignment";

        let scope = self
            .require_administer(
                actor,
                input.scope_type,
                input.scope_id.as_deref(),
                OPERATION,
                context,
            )
            .await?;

        let result = self.insert_role_assignment(actor, scope.clone(), input).await;
        self.finish(actor, &scope, OPERATION, context, result).await
    }

    /// Revokes a role assignment by soft-deleting it.
    ///
    /// Revoking an already inactive assignment succeeds without changes.
    pub async fn revoke_role_assignment(
        &self,
        actor: &PrincipalId,
        assignment_id: Uuid,
        context: &RequestContext,
    ) -> AppResult<()> {
        const OPERATION: &str = "revoke_role_assignment";

        let lookup = self
            .repository
            .find_role_assignment(assignment_id)
            .await
            .and_then(|assignment| {
                assignment.ok_or_else(|| {
                    AppError::NotFound(format!("role assignment '{assignment_id}' does not exist"))
                })
            });
        let assignment = self
            .finish(actor, &Scope::Global, OPERATION, context, lookup)
            .await?;

        let scope = self
            .require_administer(
                actor,
                assignment.scope.scope_type(),
                assignment.scope.scope_id(),
                OPERATION,
                context,
            )
            .await?;

        let result = self.deactivate_role_assignment(actor, &assignment).await;
        self.finish(actor, &scope, OPERATION, context, result).await
    }

    /// Lists role assignments.
    ///
    /// Listing one's own assignments is always allowed; any other listing
    /// requires `administer` at the filtered scope, or globally without one.
    pub async fn list_role_assignments(
        &self,
        actor: &PrincipalId,
        query: RoleAssignmentQuery,
        context: &RequestContext,
    ) -> AppResult<Vec<RoleAssignment>> {
        let own_rows = query.user_id.as_deref() == Some(actor.as_str());
        self.require_listing(
            actor,
            own_rows,
            query.scope.as_ref(),
            "list_role_assignments",
            context,
        )
        .await?;

        self.repository
            .list_role_assignments(&RoleAssignmentQuery {
                limit: clamp_limit(query.limit),
                ..query
            })
            .await
    }

    async fn insert_role_assignment(
        &self,
        actor: &PrincipalId,
        scope: Scope,
        input: CreateRoleAssignmentInput,
    ) -> AppResult<RoleAssignment> {
        let user_id = PrincipalId::new(input.user_id)?;
        let held = self
            .authorization_service
            .held_rights(actor.as_str(), &scope)
            .await?;
        let now = held.as_of();

        if input.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(AppError::Validation(
                "role assignment expiry must be in the future".to_owned(),
            ));
        }

        if input.role == Role::System && held.role() != Some(Role::System) {
            return Err(AppError::PrivilegeEscalation(format!(
                "principal '{actor}' cannot grant SYSTEM: only a SYSTEM principal may"
            )));
        }

        if !held.holds_role_at_least(input.role) {
            return Err(AppError::PrivilegeEscalation(format!(
                "principal '{actor}' cannot grant {} at {scope}",
                input.role
            )));
        }

        let assignment = RoleAssignment {
            assignment_id: Uuid::new_v4(),
            user_id: user_id.into(),
            role: input.role,
            scope,
            granted_by: actor.to_string(),
            granted_at: now,
            expires_at: input.expires_at.map(|expires_at| expires_at.trunc_subsecs(6)),
            is_active: true,
            revoked_by: None,
            revoked_at: None,
        };
        self.repository
            .insert_role_assignment(&assignment, now)
            .await?;

        info!(
            actor = %actor,
            user_id = %assignment.user_id,
            role = %assignment.role,
            scope = %assignment.scope,
            "role assignment created"
        );
        Ok(assignment)
    }

    async fn deactivate_role_assignment(
        &self,
        actor: &PrincipalId,
        assignment: &RoleAssignment,
    ) -> AppResult<()> {
        let held = self
            .authorization_service
            .held_rights(actor.as_str(), &assignment.scope)
            .await?;

        if !held.holds_role_at_least(assignment.role) {
            return Err(AppError::PrivilegeEscalation(format!(
                "principal '{actor}' cannot revoke {} at {}",
                assignment.role, assignment.scope
            )));
        }

        self.repository
            .deactivate_role_assignment(assignment.assignment_id, actor.as_str(), held.as_of())
            .await?;

        info!(
            actor = %actor,
            assignment_id = %assignment.assignment_id,
            "role assignment revoked"
        );
        Ok(())
    }
}
