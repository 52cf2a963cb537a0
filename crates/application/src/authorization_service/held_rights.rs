use chrono::{DateTime, Utc};
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{
    Action, GrantSnapshot, ResolutionMode, ResourceRef, Role, Scope, ScopeChain,
};

use super::AuthorizationService;

/// Rights a principal holds personally at one scope, through assignments only.
///
/// Delegations and approved access requests never count here, which keeps
/// delegation one hop deep and reviewer checks independent of received grants.
#[derive(Debug, Clone)]
pub struct HeldRights {
    principal: String,
    chain: ScopeChain,
    snapshot: GrantSnapshot,
    as_of: DateTime<Utc>,
}

impl HeldRights {
    /// Returns the role of the most specific effective assignment.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.snapshot
            .effective_assignment(&self.principal, &self.chain, self.as_of)
            .map(|assignment| assignment.role)
    }

    /// Returns whether the held role carries at least `required`.
    #[must_use]
    pub fn holds_role_at_least(&self, required: Role) -> bool {
        self.snapshot
            .holds_role_at_least(&self.principal, &self.chain, self.as_of, required)
    }

    /// Returns whether the held assignment permits the action on the resource.
    #[must_use]
    pub fn permits(&self, action: Action, resource: &ResourceRef) -> bool {
        self.snapshot
            .resolve(
                &self.principal,
                action,
                resource,
                &self.chain,
                self.as_of,
                ResolutionMode::AssignmentsOnly,
            )
            .is_some()
    }

    /// Returns the instant the rights were read at.
    #[must_use]
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }
}

impl AuthorizationService {
    /// Reads the rights a principal personally holds at a scope.
    ///
    /// This is an internal check and is not audited.
    pub async fn held_rights(&self, principal: &str, scope: &Scope) -> AppResult<HeldRights> {
        let as_of = self.clock.now();
        let read = async {
            let chain = self.scope_resolver.resolve_scope_chain(scope).await?;
            let snapshot = self
                .repository
                .load_grant_snapshot(principal, &chain, as_of)
                .await?;
            Ok::<_, AppError>((chain, snapshot))
        };

        let (chain, snapshot) = tokio::time::timeout(self.config.evaluation_timeout, read)
            .await
            .map_err(|_| AppError::Internal("held rights lookup timed out".to_owned()))??;

        Ok(HeldRights {
            principal: principal.to_owned(),
            chain,
            snapshot,
            as_of,
        })
    }
}
