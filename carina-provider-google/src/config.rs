//! Provider configuration
//!
//! Built once from the provider block and passed explicitly to every resource
//! operation.

use std::sync::Arc;

use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::resource::{AttributeAccess, Attributes};

use crate::logging::{Credentials, LoggingApi, RestLoggingClient};

/// Environment variables consulted for the default project, in order
pub const PROJECT_ENV_VARS: &[&str] = &[
    "GOOGLE_PROJECT",
    "GOOGLE_CLOUD_PROJECT",
    "GCLOUD_PROJECT",
    "CLOUDSDK_CORE_PROJECT",
];

/// Ambient configuration shared by all resources of the provider
#[derive(Clone)]
pub struct ProviderConfig {
    project: Option<String>,
    logging: Arc<dyn LoggingApi>,
}

impl ProviderConfig {
    pub fn new(logging: Arc<dyn LoggingApi>) -> Self {
        Self {
            project: None,
            logging,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Build the configuration from a provider block.
    ///
    /// Recognized attributes: `project`, `credentials` (service account key
    /// path) and `logging_endpoint`.
    pub async fn from_attributes(attributes: &Attributes) -> ProviderResult<Self> {
        let credentials = match attributes.get_string("credentials") {
            Some(path) => Credentials::from_key_file(path),
            None => Credentials::application_default().await,
        }
        .map_err(|e| {
            ProviderError::new(format!("Failed to load Google credentials: {}", e)).with_cause(e)
        })?;

        let mut client = RestLoggingClient::new(credentials).map_err(ProviderError::from_cause)?;
        if let Some(endpoint) = attributes.get_string("logging_endpoint") {
            client = client.with_endpoint(endpoint);
        }

        let project = attributes
            .get_string("project")
            .map(str::to_string)
            .or_else(project_from_env);

        Ok(Self {
            project,
            logging: Arc::new(client),
        })
    }

    /// Default project for resources that do not declare one
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Logging API client
    pub fn logging(&self) -> Arc<dyn LoggingApi> {
        Arc::clone(&self.logging)
    }
}

/// First non-empty project from [`PROJECT_ENV_VARS`]
pub fn project_from_env() -> Option<String> {
    project_from(|name| std::env::var(name).ok())
}

fn project_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    PROJECT_ENV_VARS
        .iter()
        .filter_map(|&name| lookup(name))
        .find(|value| !value.is_empty())
}
