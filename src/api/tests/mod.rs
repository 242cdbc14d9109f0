use super::*;
use crate::orchestrator::test_helpers::{
    StubBehavior, StubMediaTool, create_test_orchestrator, create_test_orchestrator_with,
    temp_files, test_config,
};
use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;


async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_download(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/download")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_api_server_serves_and_stops_gracefully() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(16)));
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let (orchestrator, _temp) = create_test_orchestrator_with(tool, config, temp).await;

    let listener = bind(&orchestrator).await.unwrap();
    assert_ne!(listener.local_addr().unwrap().port(), 0);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, orchestrator, async move {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops after shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(16)));
    let (orchestrator, _temp) = create_test_orchestrator(tool).await;
    let app = create_router(orchestrator);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/download")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(16)));
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.api.cors_origins = vec!["https://app.example.com".to_string()];
    let (orchestrator, _temp) = create_test_orchestrator_with(tool, config, temp).await;
    let app = create_router(orchestrator);

    let request = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/download")
            .header("Origin", origin)
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app
        .clone()
        .oneshot(request("https://app.example.com"))
        .await
        .unwrap();
    assert_eq!(
        allowed
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("https://app.example.com")
    );

    let denied = app.oneshot(request("https://evil.example.com")).await.unwrap();
    assert!(denied.headers().get("access-control-allow-origin").is_none());
}
