//! Resource - Declared resources and the state observed for them

use std::collections::HashMap;

/// Attribute map shared by declared resources and observed state
pub type Attributes = HashMap<String, Value>;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "logging.project_exclusion")
    pub resource_type: String,
    /// Resource name (binding name in the configuration)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Bool(_) => "Bool",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Typed lookups over an attribute map
pub trait AttributeAccess {
    fn attributes(&self) -> &Attributes;

    /// Get a string attribute value
    fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes().get(key).and_then(Value::as_str)
    }

    /// Get a boolean attribute value
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.attributes().get(key).and_then(Value::as_bool)
    }

    /// String attribute, treating an absent value as empty
    fn string_or_empty(&self, key: &str) -> &str {
        self.get_string(key).unwrap_or_default()
    }

    /// Boolean attribute with a default value
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

impl AttributeAccess for Attributes {
    fn attributes(&self) -> &Attributes {
        self
    }
}

/// Desired state declared in configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: Attributes,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl AttributeAccess for Resource {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Current state fetched from actual infrastructure
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Handle persisted by the host to locate the remote object again
    /// (e.g., `projects/my-proj/exclusions/my-exclusion`)
    pub identifier: Option<String>,
    pub attributes: Attributes,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: Attributes) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

impl AttributeAccess for State {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}
