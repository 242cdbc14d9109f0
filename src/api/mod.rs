//! HTTP front end
//!
//! Three endpoints plus documentation:
//! - `GET /` - service banner and endpoint listing
//! - `GET /health` - readiness, downloader and temp directory status
//! - `POST /download` - fetch a video and return it streamed or base64-encoded
//! - `GET /openapi.json` - OpenAPI specification
//! - `GET /swagger-ui` - Swagger UI (if enabled)

use crate::{Orchestrator, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error_response::ErrorResponse;
pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router
pub fn create_router(orchestrator: Orchestrator) -> Router {
    let config = orchestrator.config().clone();
    let state = AppState::new(orchestrator);

    let router = Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .route("/download", post(routes::download))
        .route("/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI before applying state; it serves its own copy of the spec
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. Unparseable origins are skipped.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Bind the configured address
///
/// Kept separate from [`serve`] so startup can fail before any background
/// work begins, and so the bound port is known when `:0` was requested.
pub async fn bind(orchestrator: &Orchestrator) -> Result<TcpListener> {
    let bind_address = orchestrator.config().api.bind_address;
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );
    Ok(listener)
}

/// Serve the API on `listener` until `shutdown` resolves
///
/// In-flight responses are allowed to finish once `shutdown` fires.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use ytdlp_gateway::{Config, Orchestrator, YtDlpCli};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_env()?;
/// let tool = YtDlpCli::discover(&config.tools, config.format.clone())?;
/// let orchestrator = Orchestrator::new(config, Arc::new(tool)).await?;
///
/// let listener = ytdlp_gateway::api::bind(&orchestrator).await?;
/// orchestrator.initialize().await?;
/// ytdlp_gateway::api::serve(listener, orchestrator, std::future::pending()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve<F>(listener: TcpListener, orchestrator: Orchestrator, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(orchestrator);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
