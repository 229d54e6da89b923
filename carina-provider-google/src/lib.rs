//! Carina Google Provider
//!
//! Google Cloud Provider implementation. Currently manages Cloud Logging
//! exclusions on projects, folders, organizations and billing accounts.
//!
//! ## Module Structure
//!
//! - `config` - Provider configuration (default project, API client)
//! - `logging` - Logging ids, API clients and exclusion resources

pub mod config;
pub mod logging;

pub use config::ProviderConfig;
pub use logging::LoggingExclusionResource;

use carina_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use carina_core::resource::{Attributes, Resource, ResourceId, State};

/// Google Cloud Provider
pub struct GoogleProvider {
    config: ProviderConfig,
    resources: Vec<LoggingExclusionResource>,
}

impl GoogleProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            resources: LoggingExclusionResource::all(),
        }
    }

    /// Create a provider from a provider block, authenticating with
    /// Application Default Credentials unless `credentials` is set
    pub async fn from_attributes(attributes: &Attributes) -> ProviderResult<Self> {
        Ok(Self::new(ProviderConfig::from_attributes(attributes).await?))
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn resource(&self, id: &ResourceId) -> ProviderResult<LoggingExclusionResource> {
        self.resources
            .iter()
            .find(|r| r.type_name() == id.resource_type)
            .copied()
            .ok_or_else(|| {
                ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                    .for_resource(id.clone())
            })
    }
}

impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.resources
            .iter()
            .map(|r| Box::new(*r) as Box<dyn ResourceType>)
            .collect()
    }

    fn read(
        &self,
        resource: &Resource,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move {
            let handler = self.resource(&resource.id)?;
            match identifier {
                Some(identifier) => handler.read(&self.config, &resource, &identifier).await,
                None => Ok(State::not_found(resource.id)),
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            let handler = self.resource(&resource.id)?;
            handler.create(&self.config, &resource).await
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            let handler = self.resource(&id)?;
            handler.update(&self.config, &identifier, &from, &to).await
        })
    }

    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>> {
        let state = state.clone();
        Box::pin(async move {
            let handler = self.resource(&state.id)?;
            handler.delete(&self.config, &state).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::InMemoryLoggingApi;
    use std::sync::Arc;

    fn provider() -> GoogleProvider {
        GoogleProvider::new(ProviderConfig::new(Arc::new(InMemoryLoggingApi::new())))
    }

    #[test]
    fn lists_exclusion_resource_types() {
        let names: Vec<&str> = provider()
            .resource_types()
            .iter()
            .map(|t| t.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "logging.project_exclusion",
                "logging.folder_exclusion",
                "logging.organization_exclusion",
                "logging.billing_account_exclusion",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_resource_type_fails() {
        let resource = Resource::new("storage.bucket", "logs");
        let err = provider().create(&resource).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "[storage.bucket.logs] Unknown resource type: storage.bucket"
        );
    }

    #[tokio::test]
    async fn read_without_identifier_is_not_found() {
        let resource = Resource::new("logging.project_exclusion", "basic");
        let state = provider().read(&resource, None).await.unwrap();
        assert!(!state.exists);
    }
}
