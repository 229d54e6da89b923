//! Cloud Logging resources
//!
//! - `id` - Canonical ids of logging resources
//! - `api` - Logging API trait and record types
//! - `rest` - HTTPS client for the Logging API
//! - `memory` - In-memory Logging API
//! - `updater` - Parent-specific exclusion addressing
//! - `exclusion` - CRUD handlers for exclusion resources

pub mod api;
pub mod error;
pub mod exclusion;
pub mod id;
pub mod memory;
pub mod rest;
pub mod updater;

pub use api::{ApiError, ApiResult, LogExclusion, LoggingApi};
pub use error::LoggingError;
pub use exclusion::LoggingExclusionResource;
pub use id::{ExclusionId, IdParseError, SinkId};
pub use memory::InMemoryLoggingApi;
pub use rest::{Credentials, RestLoggingClient};
pub use updater::{ExclusionUpdater, NewUpdaterFn, ParentKind};
