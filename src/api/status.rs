// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Banner, liveness and configuration status

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::version::{get_version_info, SERVICE_NAME, VERSION_NUMBER};
use crate::vision::YoloTask;

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": SERVICE_NAME,
        "version": VERSION_NUMBER,
    }))
}

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "healthy",
        "message": "服务运行正常",
    }))
}

/// GET /api/status - which adapters and models are usable
pub async fn api_status_handler(State(state): State<AppState>) -> Json<Value> {
    let keys = &state.keys;
    let models = &state.models;
    let model_files = models.list_models().await;

    Json(json!({
        "success": true,
        "data": {
            "keys_config": if keys.loaded { "已加载" } else { "未找到" },
            "tencent_cloud": {
                "configured": keys.tencent.is_configured(),
                "region": keys.tencent.region(),
            },
            "baidu_ai": {
                "configured": keys.baidu.is_configured(),
            },
            "baidu_free": {
                "ocr_configured": keys.baidu_ocr.is_configured(),
                "nlp_configured": keys.baidu_nlp.is_configured(),
                "image_search_configured": keys.baidu_image_search.is_configured(),
            },
            "lpr": {
                "available": models.has_plate_recognizer(),
            },
            "models": {
                "detect": models.is_available(YoloTask::Detect),
                "classify": models.is_available(YoloTask::Classify),
                "pose": models.is_available(YoloTask::Pose),
                "segment": models.is_available(YoloTask::Segment),
            },
            "model_files": model_files,
            "providers": state.providers.names(),
            "version": get_version_info(),
        }
    }))
}
