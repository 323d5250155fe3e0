// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Vendor adapters against a local mock of the Tencent and Baidu APIs

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, Uri},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tower::util::ServiceExt;
use vision_gateway::{
    api::http_server::{create_app, AppState},
    config::{AppCredentials, TencentCredentials},
    providers::{BaiduFreeProvider, BaiduProvider, TencentProvider},
};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post(state: &AppState, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = create_app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// ---------------------------------------------------------------------------
// Tencent
// ---------------------------------------------------------------------------

async fn tencent_mock(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !authorization.starts_with("TC3-HMAC-SHA256 Credential=AKIDTEST/")
        || headers.get("x-tc-version").unwrap() != "2019-05-29"
    {
        return Json(json!({"Response": {"Error": {"Code": "AuthFailure", "Message": "bad signature"}}}));
    }

    let action = headers.get("x-tc-action").unwrap().to_str().unwrap();
    let reply = match action {
        "DetectLabel" => {
            assert_eq!(body["Scenes"], json!(["CAMERA"]));
            json!({"Labels": [
                {"Name": "猫", "Confidence": 92, "FirstCategory": "动物", "SecondCategory": "猫科"}
            ], "RequestId": "req-1"})
        }
        "DetectLabelPro" => json!({"Labels": [
            {"Name": "汽车", "Confidence": 80, "FirstCategory": "交通工具", "SecondCategory": "轿车"},
            {"Name": "道路", "Confidence": 60, "FirstCategory": "场景", "SecondCategory": ""}
        ]}),
        "RecognizeCar" => json!({
            "CarCoords": [
                {"X": 10, "Y": 20, "Width": 100, "Height": 50},
                {"X": 0, "Y": 0, "Width": 5, "Height": 5}
            ],
            "CarTags": [
                {"Brand": "大众", "Type": "朗逸", "Color": "白", "Year": 2019, "Confidence": 88}
            ]
        }),
        _ => json!({"Error": {"Code": "InvalidAction", "Message": action}}),
    };
    Json(json!({"Response": reply}))
}

async fn tencent_state(secret_id: &str) -> AppState {
    let url = spawn_mock(Router::new().route("/", axum::routing::post(tencent_mock))).await;
    let credentials = TencentCredentials {
        secret_id: secret_id.to_string(),
        secret_key: "secret".to_string(),
        region: Some("ap-shanghai".to_string()),
    };
    AppState::new_for_test()
        .with_provider(Arc::new(TencentProvider::new(credentials, TIMEOUT).with_endpoint(&url)))
}

#[tokio::test]
async fn test_tencent_detect_label() {
    let state = tencent_state("AKIDTEST").await;
    let (status, body) = post(&state, "/api/tencent/detect", json!({"image_base64": "AAAA"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["task"], "tencent_detect");
    let data = &body["data"];
    assert_eq!(data["count"], 1);
    assert_eq!(data["source"], "tencent_cloud");
    assert_eq!(data["labels"][0]["name"], "猫");
    assert_eq!(data["labels"][0]["name_en"], "动物");
    assert_eq!(data["labels"][0]["category"], "猫科");
    assert!((data["labels"][0]["confidence"].as_f64().unwrap() - 0.92).abs() < 1e-9);
}

#[tokio::test]
async fn test_tencent_label_pro() {
    let state = tencent_state("AKIDTEST").await;
    let (status, body) = post(&state, "/api/tencent/label", json!({"image_base64": "AAAA"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"], "tencent_label");
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["labels"][0]["first_category"], "交通工具");
    assert_eq!(body["data"]["labels"][1]["second_category"], "");
}

#[tokio::test]
async fn test_tencent_car_pairs_coords_with_tags() {
    let state = tencent_state("AKIDTEST").await;
    let (status, body) = post(
        &state,
        "/api/tencent/detect",
        json!({"image_base64": "data:image/jpeg;base64,AAAA", "api_type": "car"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"], "tencent_car");
    let cars = body["data"]["cars"].as_array().unwrap();
    assert_eq!(cars.len(), 2);
    assert_eq!(cars[0]["brand"], "大众");
    assert_eq!(cars[0]["model"], "朗逸");
    assert_eq!(cars[0]["bbox"]["x2"], 110.0);
    assert_eq!(cars[0]["bbox"]["y2"], 70.0);
    assert_eq!(cars[1]["brand"], "未知");
    assert_eq!(cars[1]["color"], "未知");
}

#[tokio::test]
async fn test_tencent_malformed_image_never_reaches_vendor() {
    // The mock would answer success for any payload
    let state = tencent_state("AKIDTEST").await;
    let (status, body) = post(
        &state,
        "/api/tencent/detect",
        json!({"image_base64": "!!!not base64!!!"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["task"], "tencent_detect");
}

#[tokio::test]
async fn test_tencent_error_object_is_bad_gateway() {
    let state = tencent_state("AKIDOTHER").await;
    let (status, body) = post(&state, "/api/tencent/label", json!({"image_base64": "AAAA"})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["task"], "tencent_label");
    assert!(body["message"].as_str().unwrap().contains("AuthFailure"));
}

// ---------------------------------------------------------------------------
// Baidu
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct BaiduMock {
    token_requests: Arc<AtomicUsize>,
}

async fn baidu_mock(State(mock): State<BaiduMock>, uri: Uri, body: String) -> Json<Value> {
    let path = uri.path();
    if path == "/oauth/2.0/token" {
        mock.token_requests.fetch_add(1, Ordering::SeqCst);
        return Json(json!({"access_token": "24.mock-token", "expires_in": 2592000}));
    }
    if path == "/server_api" {
        let request: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(request["token"], "24.mock-token");
        assert_eq!(request["dev_pid"], 1737);
        assert_eq!(request["rate"], 16000);
        assert_eq!(request["speech"], "UklGRiQAAABXQVZF");
        assert_eq!(request["len"], 12);
        return Json(json!({"err_no": 0, "err_msg": "success.", "corpus_no": "6433", "sn": "sn-1", "result": ["hello ", "world"]}));
    }
    if uri.query().map_or(true, |q| !q.contains("access_token=24.mock-token")) {
        return Json(json!({"error_code": 110, "error_msg": "Access token invalid or no longer valid"}));
    }

    let reply = match path {
        "/rest/2.0/image-classify/v2/advanced_general" => json!({
            "log_id": 123456789,
            "result_num": 2,
            "result": [
                {"keyword": "橘猫", "score": 0.87, "root": "动物-猫", "baike_info": {"baike_url": "http://baike/cat", "description": "猫"}},
                {"keyword": "毯子", "score": 0.12, "root": "商品-家纺"}
            ]
        }),
        "/rest/2.0/image-classify/v1/object_detect" => json!({
            "log_id": 1,
            "result": {"left": 10, "top": 20, "width": 30, "height": 40}
        }),
        "/rest/2.0/face/v3/detect" => json!({"error_code": 222202, "error_msg": "pic not has face"}),
        "/rest/2.0/image-classify/v1/car" => json!({"error_code": 17, "error_msg": "Open api daily request limit reached"}),
        "/rest/2.0/ocr/v1/general_basic" => json!({
            "log_id": 7,
            "words_result_num": 4,
            "words_result": [
                {"words": "1. 计算 2+3"},
                {"words": "答：5"},
                {"words": "2. 填空"},
                {"words": "第三题 选择"}
            ]
        }),
        "/rest/2.0/ocr/v1/formula" => json!({
            "words_result": [{"words": "x^2+y^2=1", "probability": {"average": 0.95, "min": 0.9}}]
        }),
        "/rest/2.0/realtime_search/same_hq/search" => json!({
            "log_id": 9,
            "result": [{"score": 0.99, "brief": "{\"name\":\"cat\"}", "cont_sign": "1,2"}]
        }),
        "/rest/2.0/realtime_search/same_hq/add" => json!({"log_id": 10, "cont_sign": "3,4"}),
        _ => json!({"error_code": 3, "error_msg": "Unsupported openapi method"}),
    };
    Json(reply)
}

async fn baidu_server() -> (String, BaiduMock) {
    let mock = BaiduMock::default();
    let router = Router::new().fallback(baidu_mock).with_state(mock.clone());
    (spawn_mock(router).await, mock)
}

fn credentials() -> AppCredentials {
    AppCredentials::new("1000", "api-key", "secret-key")
}

#[tokio::test]
async fn test_baidu_classify_and_token_cache() {
    let (url, mock) = baidu_server().await;
    let provider = BaiduProvider::new(credentials(), credentials(), TIMEOUT).with_base_url(&url);
    let state = AppState::new_for_test().with_provider(Arc::new(provider));

    let (status, body) = post(&state, "/api/baidu/image", json!({"image_base64": "AAAA"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"], "baidu_classify");
    let data = &body["data"];
    assert_eq!(data["count"], 2);
    assert_eq!(data["source"], "baidu_ai");
    assert_eq!(data["log_id"], 123456789);
    assert_eq!(data["items"][0]["name"], "橘猫");
    assert_eq!(data["items"][0]["baike_url"], "http://baike/cat");
    assert_eq!(data["items"][1]["description"], "");

    let (status, body) = post(
        &state,
        "/api/baidu/detect",
        json!({"image_base64": "AAAA", "api_type": "detect"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["objects"][0]["name"], "主体");

    assert_eq!(mock.token_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_baidu_malformed_image_skips_token_request() {
    let (url, mock) = baidu_server().await;
    let provider = BaiduProvider::new(credentials(), credentials(), TIMEOUT).with_base_url(&url);
    let state = AppState::new_for_test().with_provider(Arc::new(provider));

    let (status, body) = post(&state, "/api/baidu/image", json!({"image_base64": "!!!not base64!!!"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["task"], "baidu_classify");

    let (status, _) = post(&state, "/api/baidu/image", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(mock.token_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_baidu_no_face_is_empty_success() {
    let (url, _) = baidu_server().await;
    let provider = BaiduProvider::new(credentials(), credentials(), TIMEOUT).with_base_url(&url);
    let state = AppState::new_for_test().with_provider(Arc::new(provider));

    let (status, body) = post(
        &state,
        "/api/baidu/image",
        json!({"image_base64": "AAAA", "api_type": "face"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "未检测到人脸");
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn test_baidu_error_code_is_bad_gateway() {
    let (url, _) = baidu_server().await;
    let provider = BaiduProvider::new(credentials(), credentials(), TIMEOUT).with_base_url(&url);
    let state = AppState::new_for_test().with_provider(Arc::new(provider));

    let (status, body) = post(
        &state,
        "/api/baidu/image",
        json!({"image_base64": "AAAA", "api_type": "car"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["task"], "baidu_car");
    assert!(body["message"].as_str().unwrap().contains("17"));
}

#[tokio::test]
async fn test_baidu_ocr() {
    let (url, _) = baidu_server().await;
    let provider = BaiduProvider::new(credentials(), credentials(), TIMEOUT).with_base_url(&url);
    let state = AppState::new_for_test().with_provider(Arc::new(provider));

    let (status, body) = post(&state, "/api/baidu/ocr", json!({"image_base64": "AAAA"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"], "baidu_ocr");
    assert_eq!(body["data"]["words_result_num"], 4);
    assert_eq!(body["data"]["words_result"][1]["words"], "答：5");
}

async fn free_state() -> (AppState, BaiduMock) {
    let (url, mock) = baidu_server().await;
    let provider = BaiduFreeProvider::new(credentials(), credentials(), credentials(), TIMEOUT)
        .with_base_url(&url)
        .with_speech_url(&format!("{}/server_api", url));
    (
        AppState::new_for_test().with_provider(Arc::new(provider)),
        mock,
    )
}

#[tokio::test]
async fn test_free_formula_and_question_split() {
    let (state, mock) = free_state().await;

    let (status, body) = post(&state, "/api/baidu-free/formula", json!({"image_base64": "AAAA"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"], "formula_recognition");
    assert_eq!(body["data"]["formulas"][0]["words"], "x^2+y^2=1");
    assert_eq!(body["data"]["formulas"][0]["confidence"], 0.95);

    let (status, body) = post(
        &state,
        "/api/baidu-free/question-split",
        json!({"image_base64": "AAAA"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"], "question_segment");
    let questions = body["data"]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions[0]["content"].as_str().unwrap().contains("答：5"));

    // Both calls used the OCR credential set
    assert_eq!(mock.token_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_free_speech() {
    let (state, _) = free_state().await;
    let (status, body) = post(
        &state,
        "/api/baidu-free/speech",
        json!({"audio_base64": "UklGRiQA\nAABXQVZF\n", "language": "english"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"], "speech_recognition");
    assert_eq!(body["data"]["result"], "hello world");
    assert_eq!(body["data"]["sn"], "sn-1");
}

#[tokio::test]
async fn test_free_image_search_library() {
    let (state, _) = free_state().await;

    let (status, body) = post(
        &state,
        "/api/baidu-free/image-search",
        json!({"image_base64": "AAAA", "search_type": "same"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result_num"], 1);
    assert_eq!(body["data"]["result"][0]["cont_sign"], "1,2");

    let (status, body) = post(
        &state,
        "/api/baidu-free/image-search/add",
        json!({"image_base64": "AAAA"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"], "image_add");
    assert_eq!(body["data"]["cont_sign"], "3,4");

    let (status, body) = post(&state, "/api/baidu-free/image-search/delete", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["task"], "image_delete");
}
