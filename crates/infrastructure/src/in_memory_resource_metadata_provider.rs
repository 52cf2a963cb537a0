use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use gatehouse_application::{ResourceMetadataProvider, ResourceOwnership};
use gatehouse_core::AppResult;
use gatehouse_domain::ResourceKind;

/// In-memory resource ownership table.
#[derive(Debug, Default)]
pub struct InMemoryResourceMetadataProvider {
    owners: RwLock<HashMap<(ResourceKind, String), ResourceOwnership>>,
}

impl InMemoryResourceMetadataProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the owning team and organization of a resource.
    pub async fn set_owner(
        &self,
        resource: ResourceKind,
        resource_id: impl Into<String>,
        ownership: ResourceOwnership,
    ) {
        self.owners
            .write()
            .await
            .insert((resource, resource_id.into()), ownership);
    }
}

#[async_trait]
impl ResourceMetadataProvider for InMemoryResourceMetadataProvider {
    async fn get_owning_team_and_org(
        &self,
        resource: ResourceKind,
        resource_id: &str,
    ) -> AppResult<Option<ResourceOwnership>> {
        Ok(self
            .owners
            .read()
            .await
            .get(&(resource, resource_id.to_owned()))
            .cloned())
    }
}
