// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local vision processing on CPU
//!
//! This module provides:
//! - YOLO11 detection, classification, pose estimation and segmentation
//! - License plate recognition (detector + CTC recognizer)
//! - Scene analysis on top of classification output
//! - Annotation drawing and animated-frame (video) helpers

pub mod draw;
pub mod image_utils;
pub mod labels;
pub mod lpr;
pub mod model_manager;
pub mod scene;
pub mod session;
pub mod video;
pub mod yolo;

use thiserror::Error;

pub use draw::Annotator;
pub use lpr::{LicensePlate, PlateRecognizer};
pub use image_utils::{
    decode_base64_bytes, decode_base64_image, decode_image_bytes, detect_format,
    encode_jpeg_base64, rgb_to_hsv, strip_data_url, ImageError, ImageInfo,
};
pub use model_manager::{ModelStatus, VisionModelConfig, VisionModelManager};
pub use yolo::{
    BoundingBox, Classification, Detection, Keypoint, PoseResult, SegmentResult, YoloModel,
    YoloTask,
};

/// Errors raised while running a local model
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model not available: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Runtime(String),

    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),

    #[error(transparent)]
    Image(#[from] ImageError),
}

impl From<ort::Error> for InferenceError {
    fn from(e: ort::Error) -> Self {
        InferenceError::Runtime(e.to_string())
    }
}
