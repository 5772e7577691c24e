//! REFLECT Common Library
//!
//! Typed data model, HTTP API client and the client-side logic of the REFLECT
//! audio journal: transcript redaction editing, the recordings filter/sort
//! pipeline, entry creation, analytics and server-status monitoring.

pub mod analytics;
pub mod api;
pub mod capture;
pub mod config;
pub mod entry;
pub mod format;
pub mod insights;
pub mod library;
pub mod logging;
pub mod redaction;
pub mod routes;
pub mod status;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError};
pub use types::*;
