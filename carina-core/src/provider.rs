//! Provider - Trait abstracting resource operations
//!
//! A Provider defines operations for a specific infrastructure (AWS, GCP, etc.).
//! The host engine decides what has to change; the provider turns each decision
//! into actual API calls and reports the resulting state.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{Resource, ResourceId, State};
use crate::schema::{ResourceSchema, TypeError};

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    /// Wrap an error, using its message and keeping it as the cause
    pub fn from_cause(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(cause.to_string()).with_cause(cause)
    }

    /// Collect schema violations into a single error
    pub fn invalid_attributes(errors: &[TypeError]) -> Self {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        Self::new(format!("Invalid attributes: {}", details.join("; ")))
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Downcast the cause to a concrete error type
    pub fn cause_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.cause.as_ref().and_then(|e| e.downcast_ref::<E>())
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "logging.project_exclusion")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
    }
}

/// Main Provider trait
///
/// Each infrastructure provider (AWS, GCP, etc.) implements this trait.
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "google")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// `resource` carries whatever attributes are known for the resource (declared
    /// or previously observed); they may be empty. Returns `State::not_found()` if
    /// the resource does not exist or no identifier is known.
    fn read(
        &self,
        resource: &Resource,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the handle the host must persist
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    ///
    /// On success the host drops the persisted identifier.
    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>>;

    /// Adopt an existing remote object given only its identifier
    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = Resource::new(id.resource_type.clone(), id.name.clone());
        let identifier = identifier.to_string();
        Box::pin(async move { self.read(&resource, Some(&identifier)).await })
    }
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(
        &self,
        resource: &Resource,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(resource, identifier)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(state)
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::AttributeAccess;

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![]
        }

        fn read(
            &self,
            resource: &Resource,
            identifier: Option<&str>,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let identifier = identifier.map(|s| s.to_string());
            Box::pin(async move {
                match identifier {
                    Some(identifier) => {
                        let mut attrs = crate::resource::Attributes::new();
                        attrs.insert("name".to_string(), identifier.clone().into());
                        Ok(State::existing(id, attrs).with_identifier(identifier))
                    }
                    None => Ok(State::not_found(id)),
                }
            })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs).with_identifier("mock-id-123")) })
        }

        fn update(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let attrs = to.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs)) })
        }

        fn delete(&self, _state: &State) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn mock_provider_read_without_identifier_returns_not_found() {
        let provider = MockProvider;
        let resource = Resource::new("test", "example");
        let state = provider.read(&resource, None).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn mock_provider_create_returns_existing() {
        let provider = MockProvider;
        let resource = Resource::new("test", "example");
        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier, Some("mock-id-123".to_string()));
    }

    #[tokio::test]
    async fn default_import_reads_by_identifier() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        let state = provider
            .import(&ResourceId::new("test", "adopted"), "remote-1")
            .await
            .unwrap();
        assert!(state.exists);
        assert_eq!(state.id.name, "adopted");
        assert_eq!(state.get_string("name"), Some("remote-1"));
    }

    #[test]
    fn error_keeps_cause_for_inspection() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ProviderError::from_cause(io).for_resource(ResourceId::new("test", "example"));

        assert_eq!(err.to_string(), "[test.example] gone");
        let cause = err.cause_as::<std::io::Error>().unwrap();
        assert_eq!(cause.kind(), std::io::ErrorKind::NotFound);
    }
}
