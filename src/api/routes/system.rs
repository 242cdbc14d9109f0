//! System handlers: banner, health, OpenAPI.

use super::ServiceInfo;
use crate::api::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// GET / - Service banner and endpoint listing
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    )
)]
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    let mut endpoints = vec![
        "GET /".to_string(),
        "GET /health".to_string(),
        "POST /download".to_string(),
        "GET /openapi.json".to_string(),
    ];
    if state.config.api.swagger_ui {
        endpoints.push("GET /swagger-ui".to_string());
    }

    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: state.orchestrator.readiness().current().as_str().to_string(),
        endpoints,
    })
}

/// GET /health - Health check
///
/// Answers 200 while starting and draining too; `ready` says whether
/// downloads are accepted. Only a broken temp directory makes it fail.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Health report", body = crate::types::HealthReport),
        (status = 500, description = "Temp directory missing or not writable", body = crate::types::HealthReport)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.orchestrator.health().await;

    let status = if report.temp_dir.exists && report.temp_dir.writable {
        StatusCode::OK
    } else {
        tracing::error!(path = %report.temp_dir.path, "temp directory check failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(report))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
