use tracing::info;
use uuid::Uuid;

use gatehouse_core::{AppResult, PrincipalId};
use gatehouse_domain::{RequestContext, Role, RoleAssignment, Scope, ScopeType};

use super::SecurityAdminService;

const BOOTSTRAP_GRANTOR: &str = "bootstrap";

impl SecurityAdminService {
    /// Grants global SYSTEM to the first platform principal.
    ///
    /// Runs once at initialization; fails with `Conflict` as soon as any
    /// effective SYSTEM assignment exists.
    pub async fn bootstrap_system_principal(
        &self,
        principal: &PrincipalId,
        context: &RequestContext,
    ) -> AppResult<RoleAssignment> {
        const OPERATION: &str = "bootstrap_system_principal";

        let now = self.authorization_service.clock().now();
        let assignment = RoleAssignment {
            assignment_id: Uuid::new_v4(),
            user_id: principal.to_string(),
            role: Role::System,
            scope: Scope::Global,
            granted_by: BOOTSTRAP_GRANTOR.to_owned(),
            granted_at: now,
            expires_at: None,
            is_active: true,
            revoked_by: None,
            revoked_at: None,
        };

        let result = self
            .repository
            .insert_bootstrap_assignment(&assignment, now)
            .await
            .map(|()| assignment);

        self.record_administer_outcome(
            principal,
            ScopeType::Global,
            None,
            OPERATION,
            result.as_ref().err(),
            context,
        )
        .await;

        if result.is_ok() {
            info!(principal = %principal, "bootstrapped system principal");
        }
        result
    }
}
