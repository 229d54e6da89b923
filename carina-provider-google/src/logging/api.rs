//! Cloud Logging API surface used by the exclusion resources
//!
//! `LoggingApi` is the seam between the resource handlers and the network.
//! `RestLoggingClient` talks to the real API; `InMemoryLoggingApi` backs tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A log exclusion as represented by the Logging API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogExclusion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub disabled: bool,
}

impl LogExclusion {
    /// Fields the API accepts in an update mask
    pub const UPDATABLE_FIELDS: [&'static str; 3] = ["description", "filter", "disabled"];

    /// JSON body holding only the fields named in `update_mask`.
    ///
    /// Fields are sent even when empty or false so the server clears them.
    pub fn masked_body(&self, update_mask: &str) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        for field in update_mask.split(',').map(str::trim) {
            let value = match field {
                "name" => serde_json::json!(self.name),
                "description" => serde_json::json!(self.description),
                "filter" => serde_json::json!(self.filter),
                "disabled" => serde_json::json!(self.disabled),
                _ => continue,
            };
            body.insert(field.to_string(), value);
        }
        serde_json::Value::Object(body)
    }

    /// Apply the masked fields of `patch` onto this exclusion
    pub fn apply_mask(&mut self, patch: &LogExclusion, update_mask: &str) {
        for field in update_mask.split(',').map(str::trim) {
            match field {
                "description" => self.description = patch.description.clone(),
                "filter" => self.filter = patch.filter.clone(),
                "disabled" => self.disabled = patch.disabled,
                _ => {}
            }
        }
    }
}

/// Errors returned by the Logging API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested object does not exist (HTTP 404)
    #[error("{0} not found")]
    NotFound(String),

    /// Any other non-success response
    #[error("API request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// No access token could be obtained
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The response body was not what the API documents
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Result type for Logging API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Exclusion operations of the Logging API.
///
/// Names are full resource names (e.g. `projects/p/exclusions/x`); `parent` is a
/// parent scope such as `folders/123`.
#[async_trait]
pub trait LoggingApi: Send + Sync {
    async fn create_exclusion(&self, parent: &str, exclusion: &LogExclusion)
    -> ApiResult<LogExclusion>;

    async fn get_exclusion(&self, name: &str) -> ApiResult<LogExclusion>;

    async fn patch_exclusion(
        &self,
        name: &str,
        exclusion: &LogExclusion,
        update_mask: &str,
    ) -> ApiResult<LogExclusion>;

    async fn delete_exclusion(&self, name: &str) -> ApiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_api_response() {
        let exclusion: LogExclusion = serde_json::from_value(json!({
            "name": "no-debug",
            "filter": "severity<INFO",
            "createTime": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(exclusion.name, "no-debug");
        assert_eq!(exclusion.filter, "severity<INFO");
        assert_eq!(exclusion.description, "");
        assert!(!exclusion.disabled);
    }

    #[test]
    fn masked_body_keeps_only_masked_fields() {
        let exclusion = LogExclusion {
            disabled: false,
            ..Default::default()
        };

        assert_eq!(exclusion.masked_body("disabled"), json!({"disabled": false}));
        assert_eq!(
            exclusion.masked_body("description,disabled"),
            json!({"description": "", "disabled": false})
        );
        assert_eq!(exclusion.masked_body(""), json!({}));
    }

    #[test]
    fn apply_mask_leaves_other_fields() {
        let mut current = LogExclusion {
            name: "x".to_string(),
            description: "keep".to_string(),
            filter: "old".to_string(),
            disabled: false,
        };
        let patch = LogExclusion {
            filter: "new".to_string(),
            disabled: true,
            ..Default::default()
        };

        current.apply_mask(&patch, "filter");

        assert_eq!(current.filter, "new");
        assert_eq!(current.description, "keep");
        assert!(!current.disabled);
    }
}
