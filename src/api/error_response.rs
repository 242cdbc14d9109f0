//! Error to HTTP response conversion

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// An error on its way to the client
///
/// Carries the detail-exposure setting so the body can be built without
/// reaching back into configuration.
#[derive(Debug)]
pub struct ErrorResponse {
    error: Error,
    expose_details: bool,
}

impl ErrorResponse {
    /// Wrap `error`; `expose_details` adds the `details` object to the body
    pub fn new(error: Error, expose_details: bool) -> Self {
        Self {
            error,
            expose_details,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status_code = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::warn!(
                status = status_code.as_u16(),
                code = self.error.error_code(),
                error = %self.error,
                "request failed"
            );
        }

        let body = ApiError::from_error(&self.error, self.expose_details);
        (status_code, Json(body)).into_response()
    }
}

/// Errors returned straight from a handler never carry details
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        ErrorResponse::new(self, false).into_response()
    }
}
