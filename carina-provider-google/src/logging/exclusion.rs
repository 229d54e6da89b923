//! Logging exclusion resources
//!
//! One CRUD implementation serves every parent kind. Parent-specific
//! addressing comes from the injected updater factory.

use carina_core::provider::{ProviderError, ProviderResult, ResourceType};
use carina_core::resource::{AttributeAccess, Attributes, Resource, ResourceId, State, Value};
use carina_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use log::{debug, info, warn};

use super::api::LogExclusion;
use super::error::LoggingError;
use super::id::ExclusionId;
use super::updater::{
    BillingAccountExclusionUpdater, ExclusionUpdater, FolderExclusionUpdater, NewUpdaterFn,
    OrganizationExclusionUpdater, ParentKind, ProjectExclusionUpdater,
};
use crate::config::ProviderConfig;

/// A logging exclusion resource type bound to one parent kind
#[derive(Clone, Copy)]
pub struct LoggingExclusionResource {
    kind: ParentKind,
    new_updater: NewUpdaterFn,
}

impl LoggingExclusionResource {
    pub const fn new(kind: ParentKind, new_updater: NewUpdaterFn) -> Self {
        Self { kind, new_updater }
    }

    pub fn project() -> Self {
        Self::new(ParentKind::Project, ProjectExclusionUpdater::from_attributes)
    }

    pub fn folder() -> Self {
        Self::new(ParentKind::Folder, FolderExclusionUpdater::from_attributes)
    }

    pub fn organization() -> Self {
        Self::new(
            ParentKind::Organization,
            OrganizationExclusionUpdater::from_attributes,
        )
    }

    pub fn billing_account() -> Self {
        Self::new(
            ParentKind::BillingAccount,
            BillingAccountExclusionUpdater::from_attributes,
        )
    }

    /// All exclusion resource types
    pub fn all() -> Vec<Self> {
        ParentKind::ALL
            .iter()
            .map(|kind| match kind {
                ParentKind::Project => Self::project(),
                ParentKind::Folder => Self::folder(),
                ParentKind::Organization => Self::organization(),
                ParentKind::BillingAccount => Self::billing_account(),
            })
            .collect()
    }

    /// Resource type name (e.g. "logging.project_exclusion")
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ParentKind::Project => "logging.project_exclusion",
            ParentKind::Folder => "logging.folder_exclusion",
            ParentKind::Organization => "logging.organization_exclusion",
            ParentKind::BillingAccount => "logging.billing_account_exclusion",
        }
    }

    /// Attributes shared by every exclusion resource
    fn base_schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name())
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Name of the exclusion, unique within its parent"),
            )
            .attribute(
                AttributeSchema::new("filter", AttributeType::String)
                    .required()
                    .with_description("Logging query selecting the entries to exclude"),
            )
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(
                AttributeSchema::new("disabled", AttributeType::Bool)
                    .with_default(Value::Bool(false)),
            )
    }

    fn parent_schema(&self) -> ResourceSchema {
        let attribute = AttributeSchema::new(self.kind.attribute(), AttributeType::String)
            .force_new();
        let attribute = match self.kind {
            ParentKind::Project => attribute.computed(),
            _ => attribute.required(),
        };
        ResourceSchema::new(self.type_name()).attribute(attribute)
    }

    /// Create the exclusion, then read it back
    pub async fn create(
        &self,
        config: &ProviderConfig,
        resource: &Resource,
    ) -> ProviderResult<State> {
        self.schema()
            .validate(&resource.attributes)
            .map_err(|errors| {
                ProviderError::invalid_attributes(&errors).for_resource(resource.id.clone())
            })?;

        let updater = self.updater(&resource.attributes, config, &resource.id)?;
        let (id, exclusion) = expand_exclusion(&resource.attributes, updater.as_ref())
            .map_err(|e| provider_error(e, &resource.id))?;

        updater
            .create_exclusion(&id.parent(), &exclusion)
            .await
            .map_err(|e| provider_error(e, &resource.id))?;

        let identifier = id.canonical_id();
        info!("Created logging exclusion {}", identifier);

        let state = self.read(config, resource, &identifier).await?;
        if !state.exists {
            return Err(ProviderError::new(format!(
                "Logging exclusion {} not found after create",
                identifier
            ))
            .for_resource(resource.id.clone()));
        }
        Ok(state)
    }

    /// Read the exclusion stored under `identifier`.
    ///
    /// A missing exclusion is not an error: the returned state is `not_found` so
    /// the host drops it.
    pub async fn read(
        &self,
        config: &ProviderConfig,
        resource: &Resource,
        identifier: &str,
    ) -> ProviderResult<State> {
        let id = self.remote_id(identifier, &resource.id)?;
        let identifier = id.canonical_id();
        let known = self.with_parent_from_id(&resource.attributes, &id);
        let updater = self.updater(&known, config, &resource.id)?;

        let exclusion = match updater.read_exclusion(&identifier).await {
            Ok(exclusion) => exclusion,
            Err(e) if e.is_not_found() => {
                warn!(
                    "Logging exclusion {} no longer exists, removing from state",
                    identifier
                );
                return Ok(State::not_found(resource.id.clone()));
            }
            Err(e) => return Err(provider_error(e, &resource.id)),
        };

        let mut attributes = flatten_exclusion(&exclusion);
        let attribute = self.kind.attribute();
        let parent = match self.kind {
            ParentKind::Project => Value::from(updater.resource_id()),
            _ => known
                .get(attribute)
                .cloned()
                .unwrap_or_else(|| Value::from(updater.resource_id())),
        };
        attributes.insert(attribute.to_string(), parent);

        Ok(State::existing(resource.id.clone(), attributes).with_identifier(identifier))
    }

    /// Patch the mutable fields that changed between `from` and `to`, then read back
    pub async fn update(
        &self,
        config: &ProviderConfig,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        self.schema()
            .validate(&to.attributes)
            .map_err(|errors| {
                ProviderError::invalid_attributes(&errors).for_resource(to.id.clone())
            })?;

        let id = self.remote_id(identifier, &to.id)?;
        let identifier = id.canonical_id();
        let known = self.with_parent_from_id(&to.attributes, &id);
        let updater = self.updater(&known, config, &to.id)?;

        let (exclusion, update_mask) =
            expand_exclusion_for_update(&from.attributes, &to.attributes);
        if update_mask.is_empty() {
            debug!("No changes for logging exclusion {}", identifier);
        } else {
            updater
                .update_exclusion(&identifier, &exclusion, &update_mask)
                .await
                .map_err(|e| provider_error(e, &to.id))?;
            info!("Updated logging exclusion {} ({})", identifier, update_mask);
        }

        self.read(config, to, &identifier).await
    }

    /// Delete the exclusion recorded in `state`
    pub async fn delete(&self, config: &ProviderConfig, state: &State) -> ProviderResult<()> {
        let identifier = state
            .identifier
            .as_deref()
            .ok_or_else(|| provider_error(LoggingError::MissingIdentifier, &state.id))?;
        let id = self.remote_id(identifier, &state.id)?;
        let identifier = id.canonical_id();
        let known = self.with_parent_from_id(&state.attributes, &id);
        let updater = self.updater(&known, config, &state.id)?;

        updater
            .delete_exclusion(&identifier)
            .await
            .map_err(|e| provider_error(e, &state.id))?;

        info!("Deleted logging exclusion {}", identifier);
        Ok(())
    }

    fn updater(
        &self,
        attributes: &Attributes,
        config: &ProviderConfig,
        resource_id: &ResourceId,
    ) -> ProviderResult<Box<dyn ExclusionUpdater>> {
        (self.new_updater)(attributes, config).map_err(|e| provider_error(e, resource_id))
    }

    /// Parse a stored identifier into the id the Logging API serves.
    /// Legacy `billingAccount/...` ids are moved to the `billingAccounts` collection.
    fn remote_id(
        &self,
        identifier: &str,
        resource_id: &ResourceId,
    ) -> ProviderResult<ExclusionId> {
        let id = ExclusionId::parse(identifier)
            .map_err(|e| provider_error(LoggingError::from(e), resource_id))?;
        let collection = self.kind.collection();
        if self.kind.matches(id.resource_type()) && id.resource_type() != collection {
            debug!("Rewriting legacy logging exclusion id {}", identifier);
            return Ok(ExclusionId::new(collection, id.resource_id(), id.name()));
        }
        Ok(id)
    }

    /// Fill in the parent attribute from the stored id when it is not declared.
    /// Lets an import resolve its parent from the identifier alone.
    fn with_parent_from_id(&self, attributes: &Attributes, id: &ExclusionId) -> Attributes {
        let mut known = attributes.clone();
        let attribute = self.kind.attribute();
        let declared = known.get_string(attribute).is_some_and(|v| !v.is_empty());
        if !declared && self.kind.matches(id.resource_type()) {
            known.insert(attribute.to_string(), Value::from(id.resource_id()));
        }
        known
    }
}

impl ResourceType for LoggingExclusionResource {
    fn name(&self) -> &'static str {
        self.type_name()
    }

    fn schema(&self) -> ResourceSchema {
        self.base_schema()
            .merge(self.parent_schema())
            .with_description("Excludes matching log entries from ingestion")
    }
}

fn provider_error(err: LoggingError, resource_id: &ResourceId) -> ProviderError {
    ProviderError::from_cause(err).for_resource(resource_id.clone())
}

/// Build the canonical id and the API record from declared attributes
fn expand_exclusion(
    attributes: &Attributes,
    updater: &dyn ExclusionUpdater,
) -> Result<(ExclusionId, LogExclusion), LoggingError> {
    let name = attributes
        .get_string("name")
        .ok_or(LoggingError::MissingAttribute("name"))?;
    let filter = attributes
        .get_string("filter")
        .ok_or(LoggingError::MissingAttribute("filter"))?;

    let id = ExclusionId::new(updater.resource_type(), updater.resource_id(), name);
    let exclusion = LogExclusion {
        name: name.to_string(),
        description: attributes.string_or_empty("description").to_string(),
        filter: filter.to_string(),
        disabled: attributes.get_bool_or("disabled", false),
    };
    Ok((id, exclusion))
}

/// Map an API record back to declared attributes
fn flatten_exclusion(exclusion: &LogExclusion) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("name".to_string(), Value::from(exclusion.name.as_str()));
    attributes.insert(
        "description".to_string(),
        Value::from(exclusion.description.as_str()),
    );
    attributes.insert("filter".to_string(), Value::from(exclusion.filter.as_str()));
    attributes.insert("disabled".to_string(), Value::Bool(exclusion.disabled));
    attributes
}

/// Partial record holding only the changed mutable fields, plus its update mask
fn expand_exclusion_for_update(from: &Attributes, to: &Attributes) -> (LogExclusion, String) {
    let mut exclusion = LogExclusion::default();
    let mut mask = Vec::new();

    for field in LogExclusion::UPDATABLE_FIELDS {
        let changed = match field {
            "disabled" => {
                let disabled = to.get_bool_or(field, false);
                let changed = from.get_bool_or(field, false) != disabled;
                if changed {
                    exclusion.disabled = disabled;
                }
                changed
            }
            _ => {
                let value = to.string_or_empty(field);
                let changed = from.string_or_empty(field) != value;
                if changed {
                    match field {
                        "description" => exclusion.description = value.to_string(),
                        _ => exclusion.filter = value.to_string(),
                    }
                }
                changed
            }
        };
        if changed {
            mask.push(field);
        }
    }

    (exclusion, mask.join(","))
}
