//! Route handlers for the HTTP API
//!
//! - [`system`] - banner, health, OpenAPI
//! - [`download`] - the download endpoint

use serde::Serialize;

mod download;
mod system;

pub use download::*;
pub use system::*;

/// Response for `GET /`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ServiceInfo {
    /// Service name
    pub name: String,
    /// Crate version
    pub version: String,
    /// Readiness: "ok", "starting" or "draining"
    pub status: String,
    /// Available endpoints, as "METHOD /path"
    pub endpoints: Vec<String>,
}
