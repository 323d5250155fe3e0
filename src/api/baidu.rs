// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Baidu AI (paid) endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::{api_type, dispatch, AppState, Envelope, TaskFailure, TaskInput};
use crate::providers::ProviderTask;

const PROVIDER: &str = "baidu";

/// POST /api/baidu/image and /api/baidu/detect
///
/// `api_type` is one of classify, detect, face or car; classify by default.
pub async fn baidu_image_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    let task = api_type(&input, PROVIDER, ProviderTask::Classify)?;
    dispatch(&state, PROVIDER, task, &input).await
}

/// POST /api/baidu/ocr
pub async fn baidu_ocr_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    dispatch(&state, PROVIDER, ProviderTask::Ocr, &input).await
}

/// GET /api/baidu/status
pub async fn baidu_status_handler(State(state): State<AppState>) -> Json<Value> {
    let configured = state.keys.baidu.is_configured();
    Json(json!({
        "success": true,
        "data": {
            "configured": configured,
            "message": if configured { "百度 AI API 已就绪" } else { "请配置百度 AI 密钥" },
        }
    }))
}
