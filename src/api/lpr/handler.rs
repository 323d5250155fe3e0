// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! License plate recognition endpoints

use axum::{extract::State, Json};
use image::DynamicImage;
use serde_json::{json, Value};
use tracing::info;

use crate::api::envelope::Envelope;
use crate::api::errors::{ApiError, TaskFailure};
use crate::api::http_server::AppState;
use crate::api::input::TaskInput;
use crate::api::run_blocking;
use crate::vision::lpr::supported_types;
use crate::vision::{decode_base64_image, encode_jpeg_base64};

pub const LPR_TASK: &str = "license_plate_recognition";

/// POST /api/lpr - Recognize license plates
///
/// The annotated image is only returned when at least one plate was found.
pub async fn lpr_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    recognize(&state, &input)
        .await
        .map(Json)
        .map_err(|e| e.for_task(LPR_TASK))
}

async fn recognize(state: &AppState, input: &TaskInput) -> Result<Envelope, ApiError> {
    let return_image = input.bool_or("return_image", true)?;
    let (image, _) = decode_base64_image(input.require_image()?)?;
    let recognizer = state.models.get_plate_recognizer().await?;
    let annotator = state.annotator.clone();

    let (plates, annotated) = run_blocking(move || {
        let plates = recognizer.recognize(&image)?;
        let annotated = if return_image && !plates.is_empty() {
            let canvas = annotator.draw_plates(&image, &plates);
            Some(encode_jpeg_base64(&DynamicImage::ImageRgb8(canvas))?)
        } else {
            None
        };
        Ok((plates, annotated))
    })
    .await?;

    info!("[LPR] {} plates", plates.len());
    let mut data = json!({"plates": plates, "count": plates.len()});
    if let Some(img) = annotated {
        data["annotated_image"] = Value::String(img);
    }
    Ok(Envelope::ok(
        LPR_TASK,
        format!("识别到 {} 个车牌", plates.len()),
        data,
    ))
}

/// GET /api/lpr/status
pub async fn lpr_status_handler(State(state): State<AppState>) -> Json<Value> {
    let available = state.models.has_plate_recognizer();
    Json(json!({
        "success": true,
        "data": {
            "available": available,
            "model_loaded": state.models.is_plate_recognizer_loaded().await,
            "supported_types": supported_types(),
            "message": if available { "车牌识别 API 已就绪" } else { "车牌识别模型未找到" },
        }
    }))
}
