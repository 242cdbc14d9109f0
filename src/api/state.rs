//! Application state for the API server

use super::ErrorResponse;
use crate::{Config, Error, Orchestrator};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (all fields are cheap Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// Runs downloads and reports health
    pub orchestrator: Orchestrator,

    /// Configuration, shared with the orchestrator
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(orchestrator: Orchestrator) -> Self {
        let config = orchestrator.config().clone();
        Self {
            orchestrator,
            config,
        }
    }

    /// Wrap `error` for the response, honoring the detail-exposure setting
    pub fn error_response(&self, error: Error) -> ErrorResponse {
        ErrorResponse::new(error, self.config.api.expose_error_details)
    }
}
