// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Route registration and status endpoint tests

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;
use vision_gateway::api::http_server::{create_app, AppState};

fn app() -> Router {
    create_app(AppState::new_for_test())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_root_banner() {
    let (status, body) = get_json(app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], vision_gateway::version::SERVICE_NAME);
    assert_eq!(body["version"], vision_gateway::version::VERSION_NUMBER);
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get_json(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_api_status_without_keys_or_models() {
    let (status, body) = get_json(app(), "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["keys_config"], "未找到");
    assert_eq!(data["tencent_cloud"]["configured"], false);
    assert_eq!(data["tencent_cloud"]["region"], "ap-guangzhou");
    assert_eq!(data["baidu_ai"]["configured"], false);
    assert_eq!(data["baidu_free"]["ocr_configured"], false);
    assert_eq!(data["baidu_free"]["nlp_configured"], false);
    assert_eq!(data["baidu_free"]["image_search_configured"], false);
    assert_eq!(data["lpr"]["available"], false);
    for task in ["detect", "classify", "pose", "segment"] {
        assert_eq!(data["models"][task], false, "model {}", task);
    }
}

#[tokio::test]
async fn test_adapter_status_endpoints() {
    let (_, tencent) = get_json(app(), "/api/tencent/status").await;
    assert_eq!(tencent["data"]["configured"], false);
    assert_eq!(tencent["data"]["message"], "请配置腾讯云密钥");

    let (_, baidu) = get_json(app(), "/api/baidu/status").await;
    assert_eq!(baidu["data"]["configured"], false);
    assert_eq!(baidu["data"]["message"], "请配置百度 AI 密钥");

    let (_, free) = get_json(app(), "/api/baidu-free/status").await;
    assert_eq!(free["data"]["ocr_configured"], false);
    assert_eq!(free["data"]["message"], "百度免费 API 状态检查完成");

    let (_, lpr) = get_json(app(), "/api/lpr/status").await;
    assert_eq!(lpr["data"]["available"], false);
    assert_eq!(lpr["data"]["model_loaded"], false);
    assert!(lpr["data"]["supported_types"].as_array().unwrap().len() > 1);
}

#[tokio::test]
async fn test_post_routes_registered() {
    let routes = [
        "/api/detect",
        "/api/classify",
        "/api/pose",
        "/api/segment",
        "/api/video/pose",
        "/api/lpr",
        "/api/tencent/detect",
        "/api/tencent/label",
        "/api/tencent/car",
        "/api/baidu/image",
        "/api/baidu/detect",
        "/api/baidu/ocr",
        "/api/baidu-free/ocr",
        "/api/baidu-free/formula",
        "/api/baidu-free/dict-ocr",
        "/api/baidu-free/homework",
        "/api/baidu-free/question-split",
        "/api/baidu-free/speech",
        "/api/baidu-free/image-search",
        "/api/baidu-free/image-search/add",
        "/api/baidu-free/image-search/delete",
    ];

    for route in routes {
        let request = Request::builder()
            .method(Method::POST)
            .uri(route)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_ne!(response.status(), StatusCode::NOT_FOUND, "route {}", route);
        assert_ne!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "route {}",
            route
        );
    }
}

#[tokio::test]
async fn test_wrong_method_and_unknown_route() {
    let response = app()
        .oneshot(Request::builder().uri("/api/detect").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app()
        .oneshot(Request::builder().uri("/api/wechat/config").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_is_permissive() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/detect")
        .header("origin", "http://mobile.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
