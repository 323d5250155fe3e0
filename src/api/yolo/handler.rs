// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local YOLO endpoint handlers

use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::request::{ClassifyParams, DetectionParams, VideoPoseParams, DEFAULT_IOU};
use crate::api::envelope::Envelope;
use crate::api::errors::{ApiError, TaskFailure};
use crate::api::http_server::AppState;
use crate::api::input::TaskInput;
use crate::api::run_blocking;
use crate::vision::scene::{analyze_image_features, classify_scene, DetectedObject};
use crate::vision::video::{decode_frames, encode_gif, select_frames, MAX_VIDEO_SIZE};
use crate::vision::{
    decode_base64_bytes, decode_base64_image, encode_jpeg_base64, YoloModel, YoloTask,
};

pub const DETECT_TASK: &str = "detection";
pub const CLASSIFY_TASK: &str = "classification";
pub const POSE_TASK: &str = "pose_estimation";
pub const SEGMENT_TASK: &str = "segmentation";
pub const VIDEO_POSE_TASK: &str = "video_pose_estimation";

/// Confidence used by the auxiliary detection pass of scene analysis
const SCENE_DETECT_CONF: f32 = 0.3;
const MAX_DETECTED_OBJECTS: usize = 10;

fn decode_image(input: &TaskInput) -> Result<DynamicImage, ApiError> {
    let (image, info) = decode_base64_image(input.require_image()?)?;
    debug!(
        "Decoded image: {}x{} {:?}, {} bytes",
        info.width, info.height, info.format, info.size_bytes
    );
    Ok(image)
}

fn encode_annotated(canvas: image::RgbImage) -> Result<String, ApiError> {
    Ok(encode_jpeg_base64(&DynamicImage::ImageRgb8(canvas))?)
}

/// Validate options and decode the image, then fetch the model
async fn prepare(
    state: &AppState,
    input: &TaskInput,
    task: YoloTask,
) -> Result<(DetectionParams, DynamicImage, Arc<YoloModel>), ApiError> {
    let params = DetectionParams::from_input(input)?;
    let image = decode_image(input)?;
    let model = state.models.get_yolo_model(task).await?;
    Ok((params, image, model))
}

/// POST /api/detect - Object detection
pub async fn detect_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    detect(&state, &input)
        .await
        .map(Json)
        .map_err(|e| e.for_task(DETECT_TASK))
}

async fn detect(state: &AppState, input: &TaskInput) -> Result<Envelope, ApiError> {
    let (params, image, model) = prepare(state, input, YoloTask::Detect).await?;
    let annotator = state.annotator.clone();

    let (detections, annotated) = run_blocking(move || {
        let detections = model.detect(&image, params.conf, params.iou)?;
        let annotated = if params.return_image {
            Some(encode_annotated(annotator.draw_detections(&image, &detections))?)
        } else {
            None
        };
        Ok((detections, annotated))
    })
    .await?;

    info!("[Detect] {} objects", detections.len());
    let mut data = json!({"detections": detections, "count": detections.len()});
    if let Some(img) = annotated {
        data["annotated_image"] = Value::String(img);
    }
    Ok(Envelope::ok(
        DETECT_TASK,
        format!("检测到 {} 个目标", detections.len()),
        data,
    ))
}

/// POST /api/classify - Image classification with optional scene analysis
pub async fn classify_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    classify(&state, &input)
        .await
        .map(Json)
        .map_err(|e| e.for_task(CLASSIFY_TASK))
}

async fn classify(state: &AppState, input: &TaskInput) -> Result<Envelope, ApiError> {
    let params = ClassifyParams::from_input(input)?;
    let image = Arc::new(decode_image(input)?);
    let model = state.models.get_yolo_model(YoloTask::Classify).await?;

    let img = image.clone();
    let classifications = run_blocking(move || Ok(model.classify(&img, params.top_k)?)).await?;

    let mut data = json!({"classifications": classifications});
    let mut message = format!("分类完成，Top-{} 结果", classifications.len());

    if params.analyze_scene {
        let detected_objects = auxiliary_detection(state, image.clone()).await;
        let img = image.clone();
        let features = run_blocking(move || Ok(analyze_image_features(&img))).await?;
        let analysis = classify_scene(&classifications, Some(&features), &detected_objects);

        message = format!("分类完成：{}", analysis.primary_scene.name);
        data["scene_analysis"] = json!(analysis);
        data["detected_objects"] = json!(detected_objects
            .into_iter()
            .take(MAX_DETECTED_OBJECTS)
            .collect::<Vec<_>>());
    }

    Ok(Envelope::ok(CLASSIFY_TASK, message, data))
}

/// Objects feeding scene analysis; any failure yields an empty list
async fn auxiliary_detection(state: &AppState, image: Arc<DynamicImage>) -> Vec<DetectedObject> {
    if !state.models.is_available(YoloTask::Detect) {
        debug!("Detect model absent, scene analysis without objects");
        return Vec::new();
    }

    let model = match state.models.get_yolo_model(YoloTask::Detect).await {
        Ok(model) => model,
        Err(e) => {
            warn!("⚠️ Auxiliary detection unavailable: {}", e);
            return Vec::new();
        }
    };

    let result = run_blocking(move || Ok(model.detect(&image, SCENE_DETECT_CONF, DEFAULT_IOU)?)).await;
    match result {
        Ok(detections) => detections
            .into_iter()
            .map(|d| DetectedObject {
                class_name: d.class_name,
                confidence: d.confidence,
            })
            .collect(),
        Err(e) => {
            warn!("⚠️ Auxiliary detection failed: {}", e);
            Vec::new()
        }
    }
}

/// POST /api/pose - Pose estimation
pub async fn pose_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    pose(&state, &input)
        .await
        .map(Json)
        .map_err(|e| e.for_task(POSE_TASK))
}

async fn pose(state: &AppState, input: &TaskInput) -> Result<Envelope, ApiError> {
    let (params, image, model) = prepare(state, input, YoloTask::Pose).await?;
    let annotator = state.annotator.clone();

    let (poses, annotated) = run_blocking(move || {
        let poses = model.pose(&image, params.conf, params.iou)?;
        let annotated = if params.return_image {
            Some(encode_annotated(annotator.draw_poses(&image, &poses))?)
        } else {
            None
        };
        Ok((poses, annotated))
    })
    .await?;

    let mut data = json!({"poses": poses, "count": poses.len()});
    if let Some(img) = annotated {
        data["annotated_image"] = Value::String(img);
    }
    Ok(Envelope::ok(
        POSE_TASK,
        format!("检测到 {} 人", poses.len()),
        data,
    ))
}

/// POST /api/segment - Instance segmentation
pub async fn segment_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    segment(&state, &input)
        .await
        .map(Json)
        .map_err(|e| e.for_task(SEGMENT_TASK))
}

async fn segment(state: &AppState, input: &TaskInput) -> Result<Envelope, ApiError> {
    let (params, image, model) = prepare(state, input, YoloTask::Segment).await?;
    let annotator = state.annotator.clone();

    let (segments, annotated) = run_blocking(move || {
        let segments = model.segment(&image, params.conf, params.iou)?;
        let annotated = if params.return_image {
            Some(encode_annotated(annotator.draw_segments(&image, &segments))?)
        } else {
            None
        };
        Ok((segments, annotated))
    })
    .await?;

    let mut data = json!({"segments": segments, "count": segments.len()});
    if let Some(img) = annotated {
        data["annotated_image"] = Value::String(img);
    }
    Ok(Envelope::ok(
        SEGMENT_TASK,
        format!("分割到 {} 个目标", segments.len()),
        data,
    ))
}

/// POST /api/video/pose - Pose estimation over the frames of an animation
pub async fn video_pose_handler(
    State(state): State<AppState>,
    input: TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    video_pose(&state, &input)
        .await
        .map(Json)
        .map_err(|e| e.for_task(VIDEO_POSE_TASK))
}

async fn video_pose(state: &AppState, input: &TaskInput) -> Result<Envelope, ApiError> {
    let params = VideoPoseParams::from_input(input)?;
    let bytes = decode_base64_bytes(input.require_video()?, MAX_VIDEO_SIZE)?;
    let model = state.models.get_yolo_model(YoloTask::Pose).await?;
    let annotator = state.annotator.clone();

    let data = run_blocking(move || {
        let frames = decode_frames(&bytes)?;
        let selected = select_frames(frames.len(), params.skip_frames);
        info!(
            "[VideoPose] {} frames, processing {}",
            frames.len(),
            selected.len()
        );

        let mut results = Vec::with_capacity(selected.len());
        let mut annotated_frames = Vec::new();
        let mut max_persons = 0;

        for &index in &selected {
            let frame = &frames[index];
            let poses = model.pose(&frame.image, params.conf, DEFAULT_IOU)?;
            max_persons = max_persons.max(poses.len());

            if params.return_video {
                let mut canvas = frame.image.to_rgb8();
                annotator.draw_poses_mut(&mut canvas, &poses);
                annotated_frames.push((canvas, frame.delay));
            }

            results.push(json!({
                "frame_index": index,
                "count": poses.len(),
                "poses": poses,
            }));
        }

        let mut data = json!({
            "frames": results,
            "total_frames": frames.len(),
            "processed_frames": selected.len(),
            "max_persons": max_persons,
        });
        if params.return_video && !annotated_frames.is_empty() {
            let gif = encode_gif(annotated_frames)?;
            data["annotated_video"] = Value::String(STANDARD.encode(gif));
        }
        Ok(data)
    })
    .await?;

    let processed = data["processed_frames"].as_u64().unwrap_or(0);
    Ok(Envelope::ok(
        VIDEO_POSE_TASK,
        format!("视频姿态估计完成，处理了 {} 帧", processed),
        data,
    ))
}
