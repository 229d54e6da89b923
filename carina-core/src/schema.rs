//! Schema - Define attribute schemas for resources
//!
//! Providers declare which attributes a resource type accepts, which of them
//! are required, which are filled in by the provider, and which force the
//! resource to be replaced when they change.

use std::collections::HashMap;
use std::fmt;

use crate::resource::{Attributes, Value};

/// Attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Bool,
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_))
            | (AttributeType::Bool, Value::Bool(_)) => Ok(()),
            _ => Err(TypeError::TypeMismatch {
                expected: self.to_string(),
                got: value.type_name().to_string(),
            }),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::String => "String",
            AttributeType::Bool => "Bool",
        };
        f.write_str(name)
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}': {inner}")]
    Attribute { name: String, inner: Box<TypeError> },
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Filled in by the provider when not declared
    pub computed: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// Resource schema
#[derive(Debug, Clone, Default)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Merge another schema's attributes into this one.
    /// Attributes from `other` win on name clashes.
    pub fn merge(mut self, other: ResourceSchema) -> Self {
        self.attributes.extend(other.attributes);
        self
    }

    /// Names of attributes whose change forces replacement, sorted
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        // Unknown attributes are allowed
        for (name, value) in attributes {
            if let Some(schema) = self.attributes.get(name)
                && let Err(e) = schema.attr_type.validate(value)
            {
                errors.push(TypeError::Attribute {
                    name: name.clone(),
                    inner: Box::new(e),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
