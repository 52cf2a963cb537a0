use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use gatehouse_application::{ResourceMetadataProvider, ResourceOwnership};
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::ResourceKind;

/// HTTP client for the external resource metadata service.
///
/// Calls `GET {base_url}/resources/{kind}/{id}/ownership`. A `404` means the
/// resource is unknown; any other non-success status is treated as the
/// service being unavailable.
#[derive(Clone)]
pub struct HttpResourceMetadataProvider {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpResourceMetadataProvider {
    /// Creates a provider for the given service base URL.
    pub fn new(http_client: reqwest::Client, base_url: Url) -> AppResult<Self> {
        Ok(Self {
            http_client,
            base_url: ensure_base_url(base_url)?,
        })
    }

    /// Parses a configured metadata service base URL.
    ///
    /// Only absolute `http`/`https` URLs without query or fragment are accepted.
    pub fn parse_base_url(value: &str) -> AppResult<Url> {
        let base_url = Url::parse(value.trim()).map_err(|error| {
            AppError::Validation(format!("invalid metadata base url '{value}': {error}"))
        })?;

        ensure_base_url(base_url)
    }

    fn ownership_url(&self, resource: ResourceKind, resource_id: &str) -> Url {
        let mut endpoint = self.base_url.clone();
        if let Ok(mut segments) = endpoint.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["resources", resource.as_str(), resource_id, "ownership"]);
        }

        endpoint
    }
}

fn ensure_base_url(base_url: Url) -> AppResult<Url> {
    if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
        return Err(AppError::Validation(format!(
            "metadata base url '{base_url}' must be an absolute http or https url"
        )));
    }
    if base_url.query().is_some() || base_url.fragment().is_some() {
        return Err(AppError::Validation(format!(
            "metadata base url '{base_url}' must not carry a query or fragment"
        )));
    }

    Ok(base_url)
}

#[async_trait]
impl ResourceMetadataProvider for HttpResourceMetadataProvider {
    async fn get_owning_team_and_org(
        &self,
        resource: ResourceKind,
        resource_id: &str,
    ) -> AppResult<Option<ResourceOwnership>> {
        let endpoint = self.ownership_url(resource, resource_id);
        let response = self
            .http_client
            .get(endpoint)
            .send()
            .await
            .map_err(|error| {
                AppError::MetadataUnavailable(format!(
                    "failed to call metadata service for {resource}:{resource_id}: {error}"
                ))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(resource = %resource, resource_id, "metadata service does not know resource");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::MetadataUnavailable(format!(
                "metadata service returned status {} for {resource}:{resource_id}: {body}",
                status.as_u16()
            )));
        }

        response
            .json::<ResourceOwnership>()
            .await
            .map(Some)
            .map_err(|error| {
                AppError::MetadataUnavailable(format!(
                    "failed to parse metadata service response for {resource}:{resource_id}: {error}"
                ))
            })
    }
}
