// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Vendor endpoint routing with stub adapters

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use vision_gateway::{
    api::http_server::{create_app, AppState},
    providers::{ProviderError, ProviderInput, ProviderOutput, ProviderTask, VisionProvider},
};

/// Echoes the task and payload it was asked to run
struct EchoProvider {
    name: &'static str,
    tasks: &'static [ProviderTask],
}

#[async_trait]
impl VisionProvider for EchoProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn supported_tasks(&self) -> &'static [ProviderTask] {
        self.tasks
    }

    async fn analyze(
        &self,
        task: ProviderTask,
        input: &ProviderInput,
    ) -> Result<ProviderOutput, ProviderError> {
        if !self.supports(task) {
            return Err(ProviderError::UnsupportedTask {
                provider: self.name.to_string(),
                task: task.to_string(),
            });
        }
        Ok(ProviderOutput::new(
            self.task_id(task),
            "ok",
            json!({
                "task": task.as_str(),
                "image": input.image_base64,
                "language": input.language,
            }),
        ))
    }
}

/// Always fails with the configured error
struct FailingProvider {
    name: &'static str,
    error: fn() -> ProviderError,
}

#[async_trait]
impl VisionProvider for FailingProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn supported_tasks(&self) -> &'static [ProviderTask] {
        &[ProviderTask::Classify, ProviderTask::Ocr]
    }

    async fn analyze(
        &self,
        _task: ProviderTask,
        _input: &ProviderInput,
    ) -> Result<ProviderOutput, ProviderError> {
        Err((self.error)())
    }
}

const TENCENT_TASKS: &[ProviderTask] = &[ProviderTask::Detect, ProviderTask::Label, ProviderTask::Car];

async fn post(state: AppState, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = create_app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn echo_state(name: &'static str, tasks: &'static [ProviderTask]) -> AppState {
    AppState::new_for_test().with_provider(Arc::new(EchoProvider { name, tasks }))
}

const VENDOR_IMAGE_ROUTES: [(&str, &str); 6] = [
    ("/api/tencent/detect", "tencent_detect"),
    ("/api/tencent/car", "tencent_car"),
    ("/api/baidu/image", "baidu_classify"),
    ("/api/baidu/ocr", "baidu_ocr"),
    ("/api/baidu-free/formula", "formula_recognition"),
    ("/api/baidu-free/image-search/add", "image_add"),
];

#[tokio::test]
async fn test_vendor_missing_image_is_bad_request() {
    // No credentials are configured; the missing payload is reported first
    for (uri, task) in VENDOR_IMAGE_ROUTES {
        let (status, body) = post(AppState::new_for_test(), uri, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false);
        assert_eq!(body["task"], task);
        assert!(body["message"].as_str().unwrap().contains("image_base64"), "{}", body);
    }

    let (status, body) = post(AppState::new_for_test(), "/api/baidu-free/speech", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["task"], "speech_recognition");
    assert!(body["message"].as_str().unwrap().contains("audio_base64"));
}

#[tokio::test]
async fn test_vendor_malformed_image_is_bad_request() {
    for (uri, task) in VENDOR_IMAGE_ROUTES {
        let (status, body) = post(
            AppState::new_for_test(),
            uri,
            json!({"image_base64": "!!!not base64!!!"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false);
        assert_eq!(body["task"], task);
    }

    let (status, _) = post(
        AppState::new_for_test(),
        "/api/baidu-free/speech",
        json!({"audio_base64": "%%%"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unconfigured_vendors_are_unavailable() {
    let cases = [
        ("/api/tencent/detect", "tencent_detect"),
        ("/api/tencent/car", "tencent_car"),
        ("/api/baidu/image", "baidu_classify"),
        ("/api/baidu/ocr", "baidu_ocr"),
        ("/api/baidu-free/formula", "formula_recognition"),
        ("/api/baidu-free/speech", "speech_recognition"),
        ("/api/baidu-free/image-search", "image_search"),
    ];
    for (uri, task) in cases {
        let payload = json!({"image_base64": "AAAA", "audio_base64": "UklGRiQAAABXQVZF"});
        let (status, body) = post(AppState::new_for_test(), uri, payload).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_eq!(body["success"], false);
        assert_eq!(body["task"], task);
        assert!(body["data"].is_null());
    }
}

#[tokio::test]
async fn test_tencent_api_type_selection() {
    let state = echo_state("tencent", TENCENT_TASKS);
    let (status, body) = post(state.clone(), "/api/tencent/detect", json!({"image_base64": "AAAA"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"], "tencent_detect");
    assert_eq!(body["data"]["image"], "AAAA");

    let (_, body) = post(
        state.clone(),
        "/api/tencent/detect",
        json!({"image_base64": "AAAA", "api_type": "car"}),
    )
    .await;
    assert_eq!(body["task"], "tencent_car");

    let (_, body) = post(state, "/api/tencent/label", json!({"image_base64": "AAAA"})).await;
    assert_eq!(body["task"], "tencent_label");
}

#[tokio::test]
async fn test_invalid_api_type() {
    let state = echo_state("tencent", TENCENT_TASKS);
    let (status, body) = post(
        state.clone(),
        "/api/tencent/detect",
        json!({"image_base64": "AAAA", "api_type": "teleport"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["task"], "tencent_teleport");

    // Known kind the adapter does not offer
    let (status, body) = post(
        state,
        "/api/tencent/detect",
        json!({"image_base64": "AAAA", "api_type": "face"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["task"], "tencent_face");
}

#[tokio::test]
async fn test_baidu_image_alias() {
    let tasks: &'static [ProviderTask] = &[
        ProviderTask::Classify,
        ProviderTask::Detect,
        ProviderTask::Face,
        ProviderTask::Car,
        ProviderTask::Ocr,
    ];
    for uri in ["/api/baidu/image", "/api/baidu/detect"] {
        let (_, body) = post(echo_state("baidu", tasks), uri, json!({"image_base64": "AAAA"})).await;
        assert_eq!(body["task"], "baidu_classify", "{}", uri);

        let (_, body) = post(
            echo_state("baidu", tasks),
            uri,
            json!({"image_base64": "AAAA", "api_type": "face"}),
        )
        .await;
        assert_eq!(body["task"], "baidu_face", "{}", uri);
    }
}

#[tokio::test]
async fn test_free_ocr_only_accepts_ocr_kinds() {
    let tasks: &'static [ProviderTask] = &[
        ProviderTask::Formula,
        ProviderTask::DictPen,
        ProviderTask::Homework,
        ProviderTask::QuestionSegment,
        ProviderTask::Speech,
    ];
    let (status, body) = post(
        echo_state("baidu_free", tasks),
        "/api/baidu-free/ocr",
        json!({"image_base64": "AAAA"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["task"], "formula");

    let (_, body) = post(
        echo_state("baidu_free", tasks),
        "/api/baidu-free/ocr",
        json!({"image_base64": "AAAA", "api_type": "question_segment"}),
    )
    .await;
    assert_eq!(body["data"]["task"], "question_segment");

    let (status, body) = post(
        echo_state("baidu_free", tasks),
        "/api/baidu-free/ocr",
        json!({"image_base64": "AAAA", "api_type": "speech"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_vendor_errors_map_to_status_codes() {
    let cases: [(fn() -> ProviderError, StatusCode); 4] = [
        (
            || ProviderError::Vendor {
                provider: "baidu".to_string(),
                code: "17".to_string(),
                message: "Open api daily request limit reached".to_string(),
            },
            StatusCode::BAD_GATEWAY,
        ),
        (
            || ProviderError::Timeout {
                provider: "baidu".to_string(),
                timeout_ms: 30_000,
            },
            StatusCode::GATEWAY_TIMEOUT,
        ),
        (
            || ProviderError::InvalidInput("缺少 image_base64 参数".to_string()),
            StatusCode::BAD_REQUEST,
        ),
        (
            || ProviderError::NotConfigured {
                provider: "baidu".to_string(),
            },
            StatusCode::SERVICE_UNAVAILABLE,
        ),
    ];

    for (error, expected) in cases {
        let state = AppState::new_for_test().with_provider(Arc::new(FailingProvider {
            name: "baidu",
            error,
        }));
        let (status, body) = post(state, "/api/baidu/ocr", json!({"image_base64": "AAAA"})).await;
        assert_eq!(status, expected);
        assert_eq!(body["task"], "baidu_ocr");
        assert!(body["data"].is_null());
    }
}
