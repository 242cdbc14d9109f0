//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the gateway
///
/// Served at `/openapi.json`, and through Swagger UI at `/swagger-ui` when
/// enabled.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ytdlp-gateway",
        version = "0.1.0",
        description = "Download a video through yt-dlp and receive the file, streamed or base64-encoded",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        crate::api::routes::root,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::download,
    ),
    components(schemas(
        crate::types::DownloadRequest,
        crate::types::DeliveryMode,
        crate::types::HealthReport,
        crate::types::ToolHealth,
        crate::types::TempDirHealth,
        crate::types::ToolCapabilities,
        crate::delivery::EncodedDelivery,
        crate::api::routes::ServiceInfo,
        crate::config::Config,
        crate::config::ApiConfig,
        crate::config::DownloadConfig,
        crate::config::ToolsConfig,
        crate::config::FormatConfig,
        crate::config::FormatPolicy,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "system", description = "Service status and documentation"),
        (name = "download", description = "Video downloads")
    )
)]
pub struct ApiDoc;
