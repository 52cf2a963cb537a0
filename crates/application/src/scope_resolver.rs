use std::sync::Arc;
use std::time::Duration;

use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{ResourceKind, ResourceRef, Scope, ScopeChain};
use tracing::warn;

use crate::{ResourceMetadataProvider, ResourceOwnership};

/// Resolves resources and scopes into scope chains.
///
/// Resolution performs no writes. The metadata lookup is the only external
/// call and is bounded by the configured timeout.
#[derive(Clone)]
pub struct ScopeResolver {
    provider: Arc<dyn ResourceMetadataProvider>,
    lookup_timeout: Duration,
}

impl ScopeResolver {
    /// Creates a resolver over a metadata provider.
    #[must_use]
    pub fn new(provider: Arc<dyn ResourceMetadataProvider>, lookup_timeout: Duration) -> Self {
        Self {
            provider,
            lookup_timeout,
        }
    }

    /// Resolves the chain of a resource, most specific scope first.
    ///
    /// Unknown or deleted resources resolve to the global scope only.
    pub async fn resolve_chain(&self, resource: &ResourceRef) -> AppResult<ScopeChain> {
        let Some(resource_id) = resource.id() else {
            return Ok(ScopeChain::global_only());
        };
        if resource_id.contains('\0') {
            return Err(AppError::Validation(format!(
                "{} id must not contain NUL characters",
                resource.kind
            )));
        }

        if resource.kind == ResourceKind::Organization {
            return Ok(ScopeChain::from_links(None, None, Some(resource_id)));
        }

        let Some(ownership) = self.lookup(resource.kind, resource_id).await? else {
            return Ok(ScopeChain::global_only());
        };

        Ok(match resource.kind {
            ResourceKind::Context => ScopeChain::from_links(
                Some(resource_id),
                ownership.team_id.as_deref(),
                ownership.org_id.as_deref(),
            ),
            ResourceKind::Team => {
                ScopeChain::from_links(None, Some(resource_id), ownership.org_id.as_deref())
            }
            ResourceKind::Memory | ResourceKind::AuditLog | ResourceKind::Organization => {
                ScopeChain::from_links(
                    None,
                    ownership.team_id.as_deref(),
                    ownership.org_id.as_deref(),
                )
            }
        })
    }

    /// Resolves the chain above an explicitly named scope.
    ///
    /// The named scope always leads the chain, even when its parents are unknown.
    pub async fn resolve_scope_chain(&self, scope: &Scope) -> AppResult<ScopeChain> {
        match scope {
            Scope::Global => Ok(ScopeChain::global_only()),
            Scope::Org(org_id) => Ok(ScopeChain::from_links(None, None, Some(org_id))),
            Scope::Team(team_id) => {
                let ownership = self
                    .lookup(ResourceKind::Team, team_id)
                    .await?
                    .unwrap_or_default();
                Ok(ScopeChain::from_links(
                    None,
                    Some(team_id),
                    ownership.org_id.as_deref(),
                ))
            }
            Scope::Context(context_id) => {
                let ownership = self
                    .lookup(ResourceKind::Context, context_id)
                    .await?
                    .unwrap_or_default();
                Ok(ScopeChain::from_links(
                    Some(context_id),
                    ownership.team_id.as_deref(),
                    ownership.org_id.as_deref(),
                ))
            }
        }
    }

    async fn lookup(
        &self,
        resource: ResourceKind,
        resource_id: &str,
    ) -> AppResult<Option<ResourceOwnership>> {
        let lookup = self.provider.get_owning_team_and_org(resource, resource_id);
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(Some(ownership))) if has_unusable_id(&ownership) => {
                warn!(resource = %resource, resource_id, "resource metadata carries an unusable scope id");
                Err(AppError::MetadataUnavailable(format!(
                    "metadata for {resource} '{resource_id}' carries an unusable scope id"
                )))
            }
            Ok(Ok(ownership)) => Ok(ownership),
            Ok(Err(AppError::MetadataUnavailable(message))) => {
                warn!(resource = %resource, resource_id, error = %message, "resource metadata unavailable");
                Err(AppError::MetadataUnavailable(message))
            }
            Ok(Err(error)) => {
                warn!(resource = %resource, resource_id, error = %error, "resource metadata lookup failed");
                Err(AppError::MetadataUnavailable(format!(
                    "metadata lookup for {resource} '{resource_id}' failed"
                )))
            }
            Err(_) => {
                warn!(
                    resource = %resource,
                    resource_id,
                    timeout_ms = self.lookup_timeout.as_millis(),
                    "resource metadata lookup timed out"
                );
                Err(AppError::MetadataUnavailable(format!(
                    "metadata lookup for {resource} '{resource_id}' timed out"
                )))
            }
        }
    }
}

fn has_unusable_id(ownership: &ResourceOwnership) -> bool {
    [&ownership.team_id, &ownership.org_id]
        .into_iter()
        .flatten()
        .any(|id| id.contains('\0'))
}
