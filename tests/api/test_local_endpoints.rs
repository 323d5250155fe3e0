// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Local model endpoints without models on disk
//!
//! Verifies request validation order and failure envelopes: bad options and
//! missing payloads are 400, a valid request for a missing model is 503.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use vision_gateway::api::http_server::{create_app, AppState};

// 1x1 red PNG
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

// 1x1 GIF
const TINY_GIF_BASE64: &str = "R0lGODlhAQABAIAAAP///wAAACH5BAEAAAAALAAAAAABAAEAAAICRAEAOw==";

async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(request).await
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = create_app(AppState::new_for_test())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn assert_failure(body: &Value, task: &str) {
    assert_eq!(body["success"], false);
    assert_eq!(body["task"], task);
    assert!(body["data"].is_null());
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let cases = [
        ("/api/detect", "detection"),
        ("/api/classify", "classification"),
        ("/api/pose", "pose_estimation"),
        ("/api/segment", "segmentation"),
        ("/api/lpr", "license_plate_recognition"),
    ];
    for (uri, task) in cases {
        let (status, body) = post_json(uri, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_failure(&body, task);
    }
}

#[tokio::test]
async fn test_invalid_thresholds_rejected_before_model_lookup() {
    let (status, body) = post_json(
        "/api/detect",
        json!({"image_base64": TINY_PNG_BASE64, "conf": 1.5}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, "detection");
    assert!(body["message"].as_str().unwrap().contains("conf"));

    let (status, _) = post_json(
        "/api/segment",
        json!({"image_base64": TINY_PNG_BASE64, "iou": "lots"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_undecodable_image_is_bad_request() {
    let (status, body) = post_json("/api/pose", json!({"image_base64": "@@not-base64@@"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, "pose_estimation");

    // Valid base64 that is not an image
    let (status, _) = post_json("/api/detect", json!({"image_base64": "aGVsbG8gd29ybGQ="})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_model_is_service_unavailable() {
    let cases = [
        ("/api/detect", "detection"),
        ("/api/classify", "classification"),
        ("/api/pose", "pose_estimation"),
        ("/api/segment", "segmentation"),
        ("/api/lpr", "license_plate_recognition"),
    ];
    for (uri, task) in cases {
        let (status, body) = post_json(uri, json!({"image_base64": TINY_PNG_BASE64})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_failure(&body, task);
    }
}

#[tokio::test]
async fn test_data_url_prefix_accepted() {
    let data_url = format!("data:image/png;base64,{}", TINY_PNG_BASE64);
    let (status, _) = post_json("/api/detect", json!({"image_base64": data_url})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_video_pose_validation() {
    let (status, body) = post_json("/api/video/pose", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, "video_pose_estimation");

    let (status, body) = post_json(
        "/api/video/pose",
        json!({"video_base64": TINY_GIF_BASE64, "skip_frames": 2}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_failure(&body, "video_pose_estimation");
}

#[tokio::test]
async fn test_malformed_json_body() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/detect")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["task"], "request");
}

#[tokio::test]
async fn test_multipart_upload_reaches_model_lookup() {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let png = STANDARD.decode(TINY_PNG_BASE64).unwrap();
    let boundary = "vision-gateway-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"conf\"\r\n\r\n0.4\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"red.png\"\r\n\
             Content-Type: image/png\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(&png);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/detect")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    // The file part decoded as an image, so the failure is the absent model
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_failure(&body, "detection");
}

#[tokio::test]
async fn test_multipart_invalid_option() {
    let boundary = "b0undary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"conf\"\r\n\r\n7\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/pose")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body, "pose_estimation");
}
