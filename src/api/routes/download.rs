//! The download handler.

use crate::api::{AppState, ErrorResponse};
use crate::delivery::{self, VIDEO_CONTENT_TYPE};
use crate::error::Error;
use crate::orchestrator::FetchedArtifact;
use crate::types::{DeliveryMode, DownloadRequest, Stage};
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// POST /download - Download a video and return it
///
/// The body is either the video itself (`delivery = stream`) or a JSON object
/// carrying it as a base64 data URI (`delivery = base64`). The temp file is
/// gone once the response has been handed off.
///
/// Failures carry `{"error": {"code": ..., "message": ..., "details": ...}}`.
/// `error` is an object, not a message string; `details` only appears when
/// the server exposes error details.
#[utoipa::path(
    post,
    path = "/download",
    tag = "download",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "The video: a video/mp4 body in stream mode, or this JSON object in base64 mode", body = crate::delivery::EncodedDelivery),
        (status = 400, description = "Missing URL or malformed body; `error` is an object with `code` and `message`", body = crate::error::ApiError),
        (status = 500, description = "Probe, download, verification or delivery failed; `error` is an object with `code` and `message`", body = crate::error::ApiError),
        (status = 503, description = "Not ready, shutting down, or all download slots busy; `error` is an object with `code` and `message`", body = crate::error::ApiError)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, ErrorResponse> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected request body");
            return Err(state.error_response(Error::InvalidRequest(
                "request body must be a JSON object with a url field".to_string(),
            )));
        }
    };

    tracing::debug!(stage = Stage::Validating.as_str(), "validating request");
    let url = state
        .orchestrator
        .validate_url(request.url.as_deref())
        .map_err(|e| state.error_response(e))?;

    let mode = request
        .delivery
        .unwrap_or(state.config.download.delivery_mode);

    let fetched = state
        .orchestrator
        .fetch(&url)
        .await
        .map_err(|e| state.error_response(e))?;

    let job_id = fetched.job_id;
    let response = match mode {
        DeliveryMode::Stream => stream_response(fetched).await,
        DeliveryMode::Base64 => encoded_response(fetched).await,
    }
    .map_err(|e| state.error_response(e))?;

    tracing::info!(job_id = job_id.0, delivery = ?mode, stage = Stage::Completed.as_str(), "response ready");
    Ok(response)
}

async fn stream_response(fetched: FetchedArtifact) -> crate::Result<Response> {
    let delivery = delivery::open_stream(fetched).await?;

    let headers = [
        (header::CONTENT_TYPE, VIDEO_CONTENT_TYPE.to_string()),
        (header::CONTENT_LENGTH, delivery.content_length.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", delivery.filename),
        ),
    ];

    Ok((StatusCode::OK, headers, Body::from_stream(delivery.stream)).into_response())
}

async fn encoded_response(fetched: FetchedArtifact) -> crate::Result<Response> {
    let encoded = delivery::encode_base64(fetched).await?;
    Ok((StatusCode::OK, Json(encoded)).into_response())
}
