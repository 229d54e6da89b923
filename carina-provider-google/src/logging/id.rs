//! Canonical identifiers for Cloud Logging resources
//!
//! Logging resources live under a parent scope and are stored by the host as
//! `{resource_type}/{resource_id}/{collection}/{name}`, e.g.
//! `projects/my-proj/exclusions/no-debug`.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Parent resource types accepted in logging ids.
///
/// `billingAccount` is kept for ids stored by earlier releases; `billingAccounts`
/// is the collection name the Logging API itself uses.
pub const LOGGING_RESOURCE_TYPES: &[&str] = &[
    "billingAccount",
    "billingAccounts",
    "folders",
    "organizations",
    "projects",
];

/// Error returned when a canonical id cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("unable to parse {label} id {id:?}")]
    Malformed { label: &'static str, id: String },

    #[error(
        "logging resource type {resource_type} is not valid. Valid resource types: {}",
        valid.join(", ")
    )]
    UnrecognizedResourceType {
        resource_type: String,
        valid: Vec<String>,
    },
}

/// A named collection under a logging parent scope
pub trait Collection {
    /// Literal path segment (e.g., "exclusions")
    const SEGMENT: &'static str;
    /// Human-readable name used in error messages
    const LABEL: &'static str;

    /// Pattern matching `{type}/{id}/{SEGMENT}/{name}`
    fn pattern() -> &'static Regex;
}

macro_rules! define_collection {
    ($name:ident, $segment:literal, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name;

        impl Collection for $name {
            const SEGMENT: &'static str = $segment;
            const LABEL: &'static str = $label;

            fn pattern() -> &'static Regex {
                static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
                    Regex::new(concat!("^(.+)/(.+)/", $segment, "/(.+)$"))
                        .expect("collection pattern is a valid regex")
                });
                &PATTERN
            }
        }
    };
}

define_collection!(Exclusions, "exclusions", "logging exclusion");
define_collection!(Sinks, "sinks", "logging sink");

/// Parts that make up the canonical id of a logging resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoggingId<C> {
    resource_type: String,
    resource_id: String,
    name: String,
    collection: PhantomData<C>,
}

/// Canonical id of a log exclusion
pub type ExclusionId = LoggingId<Exclusions>;

/// Canonical id of a log sink
pub type SinkId = LoggingId<Sinks>;

impl<C: Collection> LoggingId<C> {
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            name: name.into(),
            collection: PhantomData,
        }
    }

    /// Parse a canonical id, accepting only the given parent resource types
    pub fn parse_with(id: &str, recognized: &[&str]) -> Result<Self, IdParseError> {
        let caps = C::pattern()
            .captures(id)
            .ok_or_else(|| IdParseError::Malformed {
                label: C::LABEL,
                id: id.to_string(),
            })?;

        let resource_type = &caps[1];
        if !recognized.contains(&resource_type) {
            return Err(IdParseError::UnrecognizedResourceType {
                resource_type: resource_type.to_string(),
                valid: recognized.iter().map(|t| t.to_string()).collect(),
            });
        }

        Ok(Self::new(resource_type, &caps[2], &caps[3]))
    }

    /// Parse a canonical id against [`LOGGING_RESOURCE_TYPES`]
    pub fn parse(id: &str) -> Result<Self, IdParseError> {
        Self::parse_with(id, LOGGING_RESOURCE_TYPES)
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id as persisted by the host
    pub fn canonical_id(&self) -> String {
        self.to_string()
    }

    /// Parent scope of the resource (e.g. `folders/foo` for `folders/foo/exclusions/bar`)
    pub fn parent(&self) -> String {
        format!("{}/{}", self.resource_type, self.resource_id)
    }
}

impl<C: Collection> fmt::Display for LoggingId<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.resource_type,
            self.resource_id,
            C::SEGMENT,
            self.name
        )
    }
}

impl<C: Collection> FromStr for LoggingId<C> {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exclusion_id() {
        let id = ExclusionId::parse("projects/my-proj/exclusions/tf-test-excl-1").unwrap();
        assert_eq!(id.resource_type(), "projects");
        assert_eq!(id.resource_id(), "my-proj");
        assert_eq!(id.name(), "tf-test-excl-1");
        assert_eq!(id.parent(), "projects/my-proj");
        assert_eq!(id.canonical_id(), "projects/my-proj/exclusions/tf-test-excl-1");
    }

    #[test]
    fn parse_every_recognized_type() {
        for resource_type in ["billingAccount", "folders", "organizations", "projects"] {
            let raw = format!("{}/123/exclusions/no-debug", resource_type);
            let id: ExclusionId = raw.parse().unwrap();
            assert_eq!(id.resource_type(), resource_type);
            assert_eq!(id.to_string(), raw);
        }
    }

    #[test]
    fn unrecognized_resource_type() {
        let err = ExclusionId::parse("buckets/my-bucket/exclusions/no-debug").unwrap_err();
        match err {
            IdParseError::UnrecognizedResourceType { resource_type, .. } => {
                assert_eq!(resource_type, "buckets");
            }
            other => panic!("Expected UnrecognizedResourceType, got {:?}", other),
        }
    }

    #[test]
    fn greedy_type_capture_is_rejected() {
        // The first capture swallows everything up to the last two segments
        let err = ExclusionId::parse("projects/a/b/exclusions/c").unwrap_err();
        assert!(matches!(
            err,
            IdParseError::UnrecognizedResourceType { ref resource_type, .. } if resource_type == "projects/a"
        ));
    }

    #[test]
    fn malformed_ids() {
        for raw in [
            "",
            "projects/my-proj",
            "projects/my-proj/exclusions/",
            "projects//exclusions/x",
            "/my-proj/exclusions/x",
            "projects/my-proj/sinks/x",
        ] {
            let err = ExclusionId::parse(raw).unwrap_err();
            assert!(
                matches!(err, IdParseError::Malformed { .. }),
                "{:?} should be malformed, got {:?}",
                raw,
                err
            );
        }
    }

    #[test]
    fn parse_with_custom_recognized_set() {
        assert!(ExclusionId::parse_with("folders/1/exclusions/x", &["projects"]).is_err());
        assert!(ExclusionId::parse_with("folders/1/exclusions/x", &["folders"]).is_ok());
    }

    #[test]
    fn sink_ids_use_sinks_segment() {
        let id = SinkId::parse("organizations/42/sinks/audit").unwrap();
        assert_eq!(id.parent(), "organizations/42");
        assert_eq!(id.to_string(), "organizations/42/sinks/audit");
        assert!(SinkId::parse("organizations/42/exclusions/audit").is_err());
    }

    #[test]
    fn error_messages() {
        let err = ExclusionId::parse("nope").unwrap_err();
        assert_eq!(err.to_string(), "unable to parse logging exclusion id \"nope\"");

        let err = ExclusionId::parse_with("buckets/b/exclusions/x", &["folders", "projects"])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "logging resource type buckets is not valid. Valid resource types: folders, projects"
        );
    }
}
