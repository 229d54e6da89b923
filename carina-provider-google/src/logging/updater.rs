//! Parent-specific addressing for logging exclusions
//!
//! Exclusions can be attached to a project, folder, organization or billing
//! account. Each parent kind has an `ExclusionUpdater` that knows how its parent
//! id is resolved; the CRUD handlers in `exclusion` only ever see the trait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use carina_core::resource::{AttributeAccess, Attributes};

use super::api::{LogExclusion, LoggingApi};
use super::error::LoggingError;
use crate::config::ProviderConfig;

/// Kind of resource that owns an exclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentKind {
    Project,
    Folder,
    Organization,
    BillingAccount,
}

impl ParentKind {
    pub const ALL: [ParentKind; 4] = [
        ParentKind::Project,
        ParentKind::Folder,
        ParentKind::Organization,
        ParentKind::BillingAccount,
    ];

    /// Collection name used in API resource names (e.g. `projects`)
    pub fn collection(&self) -> &'static str {
        match self {
            ParentKind::Project => "projects",
            ParentKind::Folder => "folders",
            ParentKind::Organization => "organizations",
            ParentKind::BillingAccount => "billingAccounts",
        }
    }

    /// Whether an id's resource type belongs to this kind
    pub fn matches(&self, resource_type: &str) -> bool {
        resource_type == self.collection()
            || (*self == ParentKind::BillingAccount && resource_type == "billingAccount")
    }

    /// Declared attribute holding the parent id
    pub fn attribute(&self) -> &'static str {
        match self {
            ParentKind::Project => "project",
            ParentKind::Folder => "folder",
            ParentKind::Organization => "org_id",
            ParentKind::BillingAccount => "billing_account",
        }
    }
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// Exclusion operations addressed against one parent resource.
///
/// Implementations keep track of the parent resource id. Every remote error is
/// wrapped with [`ExclusionUpdater::describe`] and keeps the API error as source.
#[async_trait]
pub trait ExclusionUpdater: Send + Sync {
    fn kind(&self) -> ParentKind;

    /// The unique parent resource id (e.g. a project id)
    fn resource_id(&self) -> &str;

    fn api(&self) -> &dyn LoggingApi;

    /// Parent resource type as it appears in canonical ids
    fn resource_type(&self) -> &'static str {
        self.kind().collection()
    }

    /// Description of the parent used in error messages
    fn describe(&self) -> String {
        format!("{} {:?}", self.resource_type(), self.resource_id())
    }

    async fn create_exclusion(
        &self,
        parent: &str,
        exclusion: &LogExclusion,
    ) -> Result<(), LoggingError> {
        self.api()
            .create_exclusion(parent, exclusion)
            .await
            .map(|_| ())
            .map_err(|source| LoggingError::Remote {
                operation: "creating",
                parent: self.describe(),
                source,
            })
    }

    async fn read_exclusion(&self, id: &str) -> Result<LogExclusion, LoggingError> {
        self.api()
            .get_exclusion(id)
            .await
            .map_err(|source| LoggingError::Remote {
                operation: "retrieving",
                parent: self.describe(),
                source,
            })
    }

    async fn update_exclusion(
        &self,
        id: &str,
        exclusion: &LogExclusion,
        update_mask: &str,
    ) -> Result<(), LoggingError> {
        self.api()
            .patch_exclusion(id, exclusion, update_mask)
            .await
            .map(|_| ())
            .map_err(|source| LoggingError::Remote {
                operation: "updating",
                parent: self.describe(),
                source,
            })
    }

    async fn delete_exclusion(&self, id: &str) -> Result<(), LoggingError> {
        self.api()
            .delete_exclusion(id)
            .await
            .map_err(|source| LoggingError::Remote {
                operation: "deleting",
                parent: self.describe(),
                source,
            })
    }
}

/// Builds the updater for a resource from its attributes and the provider config
pub type NewUpdaterFn =
    fn(&Attributes, &ProviderConfig) -> Result<Box<dyn ExclusionUpdater>, LoggingError>;

/// Read a required parent attribute
fn required_parent(attributes: &Attributes, kind: ParentKind) -> Result<String, LoggingError> {
    let raw = attributes
        .get_string(kind.attribute())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LoggingError::ParentResolution {
            attribute: kind.attribute(),
            reason: format!("'{}' is not set", kind.attribute()),
        })?;
    parent_id(raw, kind)
}

/// Drop an optional `{collection}/` prefix and reject nested paths
fn parent_id(raw: &str, kind: ParentKind) -> Result<String, LoggingError> {
    let prefix = format!("{}/", kind.collection());
    let id = raw.strip_prefix(prefix.as_str()).unwrap_or(raw);
    if id.is_empty() || id.contains('/') {
        return Err(LoggingError::ParentResolution {
            attribute: kind.attribute(),
            reason: format!("{:?} is not a valid {} id", raw, kind.attribute()),
        });
    }
    Ok(id.to_string())
}

macro_rules! define_updater {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        pub struct $name {
            resource_id: String,
            api: Arc<dyn LoggingApi>,
        }

        impl $name {
            pub fn new(resource_id: impl Into<String>, api: Arc<dyn LoggingApi>) -> Self {
                Self {
                    resource_id: resource_id.into(),
                    api,
                }
            }
        }

        impl ExclusionUpdater for $name {
            fn kind(&self) -> ParentKind {
                $kind
            }

            fn resource_id(&self) -> &str {
                &self.resource_id
            }

            fn api(&self) -> &dyn LoggingApi {
                self.api.as_ref()
            }
        }
    };
}

define_updater!(
    /// Exclusions under `projects/{project}`
    ProjectExclusionUpdater,
    ParentKind::Project
);
define_updater!(
    /// Exclusions under `folders/{folder}`
    FolderExclusionUpdater,
    ParentKind::Folder
);
define_updater!(
    /// Exclusions under `organizations/{org_id}`
    OrganizationExclusionUpdater,
    ParentKind::Organization
);
define_updater!(
    /// Exclusions under `billingAccounts/{billing_account}`
    BillingAccountExclusionUpdater,
    ParentKind::BillingAccount
);

impl ProjectExclusionUpdater {
    /// Uses the `project` attribute, falling back to the provider's default project
    pub fn from_attributes(
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> Result<Box<dyn ExclusionUpdater>, LoggingError> {
        let project = attributes
            .get_string("project")
            .filter(|p| !p.is_empty())
            .or_else(|| config.project())
            .ok_or_else(|| LoggingError::ParentResolution {
                attribute: "project",
                reason: "'project' is not set and the provider has no default project"
                    .to_string(),
            })?;

        let project = parent_id(project, ParentKind::Project)?;
        Ok(Box::new(Self::new(project, config.logging())))
    }
}

impl FolderExclusionUpdater {
    pub fn from_attributes(
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> Result<Box<dyn ExclusionUpdater>, LoggingError> {
        let folder = required_parent(attributes, ParentKind::Folder)?;
        Ok(Box::new(Self::new(folder, config.logging())))
    }
}

impl OrganizationExclusionUpdater {
    pub fn from_attributes(
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> Result<Box<dyn ExclusionUpdater>, LoggingError> {
        let org_id = required_parent(attributes, ParentKind::Organization)?;
        Ok(Box::new(Self::new(org_id, config.logging())))
    }
}

impl BillingAccountExclusionUpdater {
    pub fn from_attributes(
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> Result<Box<dyn ExclusionUpdater>, LoggingError> {
        let account = required_parent(attributes, ParentKind::BillingAccount)?;
        Ok(Box::new(Self::new(account, config.logging())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::api::ApiError;
    use crate::logging::InMemoryLoggingApi;
    use carina_core::resource::Value;
    use std::error::Error as _;

    fn config() -> ProviderConfig {
        ProviderConfig::new(Arc::new(InMemoryLoggingApi::new()))
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn project_from_attribute() {
        let updater = ProjectExclusionUpdater::from_attributes(
            &attrs(&[("project", "my-proj")]),
            &config().with_project("default-proj"),
        )
        .unwrap();

        assert_eq!(updater.resource_type(), "projects");
        assert_eq!(updater.resource_id(), "my-proj");
        assert_eq!(updater.describe(), "projects \"my-proj\"");
    }

    #[test]
    fn project_falls_back_to_provider_default() {
        let updater =
            ProjectExclusionUpdater::from_attributes(&attrs(&[]), &config().with_project("dflt"))
                .unwrap();
        assert_eq!(updater.resource_id(), "dflt");
    }

    #[test]
    fn project_resolution_failure() {
        let err = ProjectExclusionUpdater::from_attributes(&attrs(&[]), &config())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LoggingError::ParentResolution {
                attribute: "project",
                ..
            }
        ));
    }

    #[test]
    fn folder_prefix_is_stripped() {
        for raw in ["1234", "folders/1234"] {
            let updater =
                FolderExclusionUpdater::from_attributes(&attrs(&[("folder", raw)]), &config())
                    .unwrap();
            assert_eq!(updater.resource_id(), "1234");
            assert_eq!(updater.resource_type(), "folders");
        }
    }

    #[test]
    fn project_prefix_is_stripped() {
        let updater = ProjectExclusionUpdater::from_attributes(
            &attrs(&[("project", "projects/my-proj")]),
            &config(),
        )
        .unwrap();
        assert_eq!(updater.resource_id(), "my-proj");

        let updater = ProjectExclusionUpdater::from_attributes(
            &attrs(&[]),
            &config().with_project("projects/dflt"),
        )
        .unwrap();
        assert_eq!(updater.resource_id(), "dflt");
    }

    #[test]
    fn project_rejects_nested_ids() {
        let err = ProjectExclusionUpdater::from_attributes(
            &attrs(&[("project", "folders/1/projects/p")]),
            &config(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            LoggingError::ParentResolution {
                attribute: "project",
                ..
            }
        ));
    }

    #[test]
    fn organization_and_billing_account() {
        let org = OrganizationExclusionUpdater::from_attributes(
            &attrs(&[("org_id", "organizations/42")]),
            &config(),
        )
        .unwrap();
        assert_eq!(org.describe(), "organizations \"42\"");

        let billing = BillingAccountExclusionUpdater::from_attributes(
            &attrs(&[("billing_account", "0000-AAAA")]),
            &config(),
        )
        .unwrap();
        assert_eq!(billing.resource_type(), "billingAccounts");
        assert_eq!(billing.resource_id(), "0000-AAAA");
    }

    #[test]
    fn required_parent_rejects_missing_and_nested_ids() {
        assert!(FolderExclusionUpdater::from_attributes(&attrs(&[]), &config()).is_err());
        assert!(
            FolderExclusionUpdater::from_attributes(&attrs(&[("folder", "")]), &config()).is_err()
        );
        assert!(
            OrganizationExclusionUpdater::from_attributes(
                &attrs(&[("org_id", "folders/1")]),
                &config()
            )
            .is_err()
        );
    }

    #[test]
    fn billing_kind_accepts_legacy_type() {
        assert!(ParentKind::BillingAccount.matches("billingAccount"));
        assert!(ParentKind::BillingAccount.matches("billingAccounts"));
        assert!(!ParentKind::Project.matches("folders"));
    }

    #[tokio::test]
    async fn remote_errors_are_wrapped_with_parent() {
        let updater = ProjectExclusionUpdater::new("my-proj", Arc::new(InMemoryLoggingApi::new()));
        let err = updater
            .read_exclusion("projects/my-proj/exclusions/missing")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().starts_with(
            "error retrieving logging exclusion for projects \"my-proj\""
        ));
        assert!(err.source().unwrap().downcast_ref::<ApiError>().is_some());
    }
}
