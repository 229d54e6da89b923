//! Carina Core
//!
//! Host contract shared by Carina providers: resources, observed state,
//! attribute schemas and the `Provider` trait.

pub mod provider;
pub mod resource;
pub mod schema;
