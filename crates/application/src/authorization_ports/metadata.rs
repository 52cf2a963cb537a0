use async_trait::async_trait;
use gatehouse_core::AppResult;
use gatehouse_domain::ResourceKind;
use serde::{Deserialize, Serialize};

/// Owning team and organization of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOwnership {
    /// Owning team, when the resource belongs to one.
    pub team_id: Option<String>,
    /// Owning organization, when known.
    pub org_id: Option<String>,
}

/// Port to the external resource metadata collaborator.
#[async_trait]
pub trait ResourceMetadataProvider: Send + Sync {
    /// Returns ownership of a resource, or `None` when it is unknown or deleted.
    async fn get_owning_team_and_org(
        &self,
        resource: ResourceKind,
        resource_id: &str,
    ) -> AppResult<Option<ResourceOwnership>>;
}
