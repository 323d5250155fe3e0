// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Baidu free-tier endpoints: education OCR, speech and image search

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::{api_type, dispatch, ApiError, AppState, Envelope, TaskFailure, TaskInput};
use crate::providers::ProviderTask;

const PROVIDER: &str = "baidu_free";

/// Tasks reachable through the generic OCR endpoint
const OCR_TASKS: [ProviderTask; 4] = [
    ProviderTask::Formula,
    ProviderTask::DictPen,
    ProviderTask::Homework,
    ProviderTask::QuestionSegment,
];

/// POST /api/baidu-free/ocr - formula by default
pub async fn free_ocr_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    let task = api_type(&input, PROVIDER, ProviderTask::Formula)?;
    if !OCR_TASKS.contains(&task) {
        return Err(
            ApiError::InvalidRequest(format!("不支持的 OCR 类型: {}", task)).for_task(task.as_str())
        );
    }
    dispatch(&state, PROVIDER, task, &input).await
}

macro_rules! fixed_task_handler {
    ($(#[$doc:meta])* $name:ident, $task:expr) => {
        $(#[$doc])*
        pub async fn $name(
            State(state): State<AppState>,
            input: TaskInput,
        ) -> Result<Json<Envelope>, TaskFailure> {
            dispatch(&state, PROVIDER, $task, &input).await
        }
    };
}

fixed_task_handler!(
    /// POST /api/baidu-free/formula
    formula_handler,
    ProviderTask::Formula
);
fixed_task_handler!(
    /// POST /api/baidu-free/dict-ocr
    dict_ocr_handler,
    ProviderTask::DictPen
);
fixed_task_handler!(
    /// POST /api/baidu-free/homework
    homework_handler,
    ProviderTask::Homework
);
fixed_task_handler!(
    /// POST /api/baidu-free/question-split
    question_split_handler,
    ProviderTask::QuestionSegment
);
fixed_task_handler!(
    /// POST /api/baidu-free/speech
    speech_handler,
    ProviderTask::Speech
);
fixed_task_handler!(
    /// POST /api/baidu-free/image-search
    image_search_handler,
    ProviderTask::ImageSearch
);
fixed_task_handler!(
    /// POST /api/baidu-free/image-search/add
    image_add_handler,
    ProviderTask::ImageAdd
);
fixed_task_handler!(
    /// POST /api/baidu-free/image-search/delete
    image_delete_handler,
    ProviderTask::ImageDelete
);

/// GET /api/baidu-free/status
pub async fn free_status_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "ocr_configured": state.keys.baidu_ocr.is_configured(),
            "nlp_configured": state.keys.baidu_nlp.is_configured(),
            "image_search_configured": state.keys.baidu_image_search.is_configured(),
            "message": "百度免费 API 状态检查完成",
        }
    }))
}
