// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! POST /api/jobs through the router, with a mocked generation API

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image_relay::api::{create_app, AppState};
use image_relay::config::RelayConfig;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/fal-ai/flux-pro/kontext";
const BOUNDARY: &str = "job-endpoint-boundary";

fn config(server: &MockServer, api_key: Option<&str>) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.fal.api_key = api_key.map(str::to_string);
    config.fal.url = format!("{}{}", server.uri(), MODEL_PATH);
    config.fal.timeout_secs = 1;
    config
}

fn app(config: &RelayConfig) -> Router {
    create_app(AppState::from_config(config).unwrap())
}

fn json_job(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_job(prompt: &str, image: &[u8], content_type: &str) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\n{p}\r\n--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"in.png\"\r\nContent-Type: {ct}\r\n\r\n",
            b = BOUNDARY,
            p = prompt,
            ct = content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/jobs")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_json_job_success() {
    let server = MockServer::start().await;
    let result = json!({"images": [{"url": "https://fal.media/out.png", "width": 1024}]});
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(result.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&config(&server, Some("k")))
        .oneshot(json_job(
            "/api/jobs",
            json!({"prompt": "make it snow", "image_base64": "data:image/png;base64,AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({"status": "success", "result": result})
    );
}

#[tokio::test]
async fn test_generate_alias_route() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&config(&server, Some("k")))
        .oneshot(json_job(
            "/api/generate",
            json!({"prompt": "make it snow", "image": "AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_multipart_job_sends_data_uri() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let png = [0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
    let response = app(&config(&server, Some("k")))
        .oneshot(multipart_job("turn it into a watercolor", &png, "image/png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let received = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(sent["prompt"], "turn it into a watercolor");
    assert!(sent["image_url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_upstream_422_becomes_502_with_body_verbatim() {
    let server = MockServer::start().await;
    let body = json!({"detail": [{"msg": "image_url must be a valid URL", "type": "value_error"}]});
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&config(&server, Some("k")))
        .oneshot(json_job(
            "/api/jobs",
            json!({"prompt": "make it snow", "image_base64": "AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(read_json(response).await, body);
}

#[tokio::test]
async fn test_upstream_timeout_becomes_504() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let response = app(&config(&server, Some("k")))
        .oneshot(json_job(
            "/api/jobs",
            json!({"prompt": "make it snow", "image_base64": "AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        read_json(response).await,
        json!({"error": "request timed out"})
    );
}

#[tokio::test]
async fn test_unreachable_upstream_becomes_500() {
    let mut config = RelayConfig::default();
    config.fal.api_key = Some("k".to_string());
    config.fal.url = "http://127.0.0.1:1/fal-ai/model".to_string();

    let response = app(&config)
        .oneshot(json_job(
            "/api/jobs",
            json!({"prompt": "make it snow", "image_base64": "AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(read_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_missing_api_key_is_500_without_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(&config(&server, None))
        .oneshot(json_job(
            "/api/jobs",
            json!({"prompt": "make it snow", "image_base64": "AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert!(body["error"].is_string());
    assert!(!body.to_string().contains("FAL_API_KEY="));
}

#[tokio::test]
async fn test_oversize_image_is_413_without_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config(&server, Some("k"));
    config.images.max_encoded_bytes = 64;

    // Body stays under the HTTP body limit so the image size guard decides
    let response = app(&config)
        .oneshot(json_job(
            "/api/jobs",
            json!({"prompt": "x", "image_base64": "A".repeat(80)}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(read_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_missing_image_is_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(&config(&server, Some("k")))
        .oneshot(json_job("/api/jobs", json!({"prompt": "make it snow"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_malformed_json_is_500() {
    let server = MockServer::start().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/jobs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"prompt\": "))
        .unwrap();

    let response = app(&config(&server, Some("k")))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(read_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_declared_oversize_body_is_413() {
    let server = MockServer::start().await;
    let mut config = config(&server, Some("k"));
    config.images.max_encoded_bytes = 16;

    let body = json!({"prompt": "x", "image_base64": "A".repeat(100)}).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/jobs")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_oversize_json_body_without_length_is_413() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config(&server, Some("k"));
    config.images.max_encoded_bytes = 16;

    // No Content-Length header: the limit trips while the body is read
    let response = app(&config)
        .oneshot(json_job(
            "/api/jobs",
            json!({"prompt": "x", "image_base64": "A".repeat(100)}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(read_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_oversize_multipart_image_without_length_is_413() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config(&server, Some("k"));
    config.images.max_encoded_bytes = 64;

    let image = vec![0xABu8; 500];
    let response = app(&config)
        .oneshot(multipart_job("make it snow", &image, "image/png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(read_json(response).await["error"].is_string());
}
