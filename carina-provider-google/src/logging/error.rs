//! Errors raised by the logging exclusion handlers

use thiserror::Error;

use super::api::ApiError;
use super::id::IdParseError;

#[derive(Debug, Error)]
pub enum LoggingError {
    /// The stored identifier is not a valid exclusion id
    #[error(transparent)]
    InvalidId(#[from] IdParseError),

    /// The parent resource id could not be determined
    #[error("cannot determine {attribute} for logging exclusion: {reason}")]
    ParentResolution {
        attribute: &'static str,
        reason: String,
    },

    /// An operation needed the persisted identifier but none was stored
    #[error("logging exclusion has no identifier")]
    MissingIdentifier,

    /// A declared attribute required for the call is absent
    #[error("attribute '{0}' is required")]
    MissingAttribute(&'static str),

    /// The Logging API rejected a call
    #[error("error {operation} logging exclusion for {parent}: {source}")]
    Remote {
        operation: &'static str,
        parent: String,
        #[source]
        source: ApiError,
    },
}

impl LoggingError {
    /// True when the API reported that the exclusion does not exist
    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_not_found)
    }

    /// The underlying API error, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            LoggingError::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}
