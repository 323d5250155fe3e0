// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tencent TIIA endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::{api_type, dispatch, AppState, Envelope, TaskFailure, TaskInput};
use crate::providers::ProviderTask;

const PROVIDER: &str = "tencent";

/// POST /api/tencent/detect - `api_type` selects detect, label or car
pub async fn tencent_detect_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    let task = api_type(&input, PROVIDER, ProviderTask::Detect)?;
    dispatch(&state, PROVIDER, task, &input).await
}

/// POST /api/tencent/label
pub async fn tencent_label_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    dispatch(&state, PROVIDER, ProviderTask::Label, &input).await
}

/// POST /api/tencent/car
pub async fn tencent_car_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    dispatch(&state, PROVIDER, ProviderTask::Car, &input).await
}

/// GET /api/tencent/status
pub async fn tencent_status_handler(State(state): State<AppState>) -> Json<Value> {
    let configured = state.keys.tencent.is_configured();
    Json(json!({
        "success": true,
        "data": {
            "configured": configured,
            "region": state.keys.tencent.region(),
            "message": if configured { "腾讯云 API 已就绪" } else { "请配置腾讯云密钥" },
        }
    }))
}
