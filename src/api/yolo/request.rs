// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Options accepted by the local YOLO endpoints

use crate::api::errors::ApiError;
use crate::api::input::TaskInput;
use crate::vision::video::DEFAULT_SKIP_FRAMES;

pub const DEFAULT_CONF: f32 = 0.25;
pub const DEFAULT_IOU: f32 = 0.45;
pub const DEFAULT_TOP_K: usize = 5;

fn unit_interval(field: &str, value: f32) -> Result<f32, ApiError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::ValidationError {
            field: field.to_string(),
            message: format!("必须在 0 到 1 之间，收到 {}", value),
        })
    }
}

/// Options for detect, pose and segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    pub conf: f32,
    pub iou: f32,
    pub return_image: bool,
}

impl DetectionParams {
    pub fn from_input(input: &TaskInput) -> Result<Self, ApiError> {
        Ok(Self {
            conf: unit_interval("conf", input.f32_or("conf", DEFAULT_CONF)?)?,
            iou: unit_interval("iou", input.f32_or("iou", DEFAULT_IOU)?)?,
            return_image: input.bool_or("return_image", true)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyParams {
    /// Accepted for compatibility; classification is never filtered by it
    pub conf: f32,
    pub top_k: usize,
    pub analyze_scene: bool,
}

impl ClassifyParams {
    pub fn from_input(input: &TaskInput) -> Result<Self, ApiError> {
        Ok(Self {
            conf: unit_interval("conf", input.f32_or("conf", DEFAULT_CONF)?)?,
            top_k: input.usize_or("top_k", DEFAULT_TOP_K)?,
            analyze_scene: input.bool_or("analyze_scene", true)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoPoseParams {
    pub conf: f32,
    pub skip_frames: usize,
    pub return_video: bool,
}

impl VideoPoseParams {
    pub fn from_input(input: &TaskInput) -> Result<Self, ApiError> {
        Ok(Self {
            conf: unit_interval("conf", input.f32_or("conf", DEFAULT_CONF)?)?,
            skip_frames: input.usize_or("skip_frames", DEFAULT_SKIP_FRAMES)?,
            return_video: input.bool_or("return_video", true)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detection_defaults() {
        let params = DetectionParams::from_input(&TaskInput::default()).unwrap();
        assert_eq!(params.conf, DEFAULT_CONF);
        assert_eq!(params.iou, DEFAULT_IOU);
        assert!(params.return_image);
    }

    #[test]
    fn test_threshold_range() {
        let input = TaskInput::from_json(json!({"conf": 1.5}));
        match DetectionParams::from_input(&input).unwrap_err() {
            ApiError::ValidationError { field, .. } => assert_eq!(field, "conf"),
            other => panic!("unexpected error: {:?}", other),
        }

        let input = TaskInput::from_json(json!({"iou": -0.1}));
        assert!(DetectionParams::from_input(&input).is_err());

        let input = TaskInput::from_json(json!({"conf": 0, "iou": 1}));
        assert!(DetectionParams::from_input(&input).is_ok());
    }

    #[test]
    fn test_classify_and_video_params() {
        let input = TaskInput::from_json(json!({"top_k": 0, "analyze_scene": false}));
        let params = ClassifyParams::from_input(&input).unwrap();
        assert_eq!(params.top_k, 0);
        assert!(!params.analyze_scene);

        let params = VideoPoseParams::from_input(&TaskInput::default()).unwrap();
        assert_eq!(params.skip_frames, DEFAULT_SKIP_FRAMES);
        assert!(params.return_video);
    }
}
