// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO11 ONNX pipeline
//!
//! One model file per task. Detect, pose and segment share the anchor-major
//! `[1, 4 + nc + extra, N]` head; classify emits a probability vector.

pub mod model;
pub mod postprocessing;
pub mod preprocessing;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use model::YoloModel;

/// The four local YOLO tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YoloTask {
    Detect,
    Classify,
    Pose,
    Segment,
}

impl YoloTask {
    pub const ALL: [YoloTask; 4] = [
        YoloTask::Detect,
        YoloTask::Classify,
        YoloTask::Pose,
        YoloTask::Segment,
    ];

    /// Model file name under the models directory
    pub fn model_file(&self) -> &'static str {
        match self {
            YoloTask::Detect => "yolo11n.onnx",
            YoloTask::Classify => "yolo11n-cls.onnx",
            YoloTask::Pose => "yolo11n-pose.onnx",
            YoloTask::Segment => "yolo11n-seg.onnx",
        }
    }

    /// Short name used in status payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            YoloTask::Detect => "detect",
            YoloTask::Classify => "classify",
            YoloTask::Pose => "pose",
            YoloTask::Segment => "segment",
        }
    }
}

impl fmt::Display for YoloTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned box in original image pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let left = self.x1.max(other.x1);
        let top = self.y1.max(other.y1);
        let right = self.x2.min(other.x2);
        let bottom = self.y2.min(other.y2);
        (right - left).max(0.0) * (bottom - top).max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    /// Clamp all corners into `[0, width] x [0, height]`
    pub fn clamp_to(&self, width: f32, height: f32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
            x2: self.x2.clamp(0.0, width),
            y2: self.y2.clamp(0.0, height),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub class_id: usize,
    pub class_name: String,
    pub class_name_cn: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseResult {
    pub person_id: usize,
    pub bbox: Option<BoundingBox>,
    pub keypoints: Vec<Keypoint>,
}

/// Segmented instance; serialized like a detection, mask kept for drawing
#[derive(Debug, Clone, Serialize)]
pub struct SegmentResult {
    #[serde(flatten)]
    pub detection: Detection,
    #[serde(skip)]
    pub mask: Option<GrayImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_to_bounds() {
        let b = BoundingBox::new(-5.0, 3.0, 120.0, 90.0).clamp_to(100.0, 80.0);
        assert_eq!(b, BoundingBox::new(0.0, 3.0, 100.0, 80.0));
    }

    #[test]
    fn test_segment_serializes_as_detection() {
        let seg = SegmentResult {
            detection: Detection {
                class_id: 0,
                class_name: "person".to_string(),
                confidence: 0.9,
                bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            },
            mask: Some(GrayImage::new(4, 4)),
        };
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["class_name"], "person");
        assert_eq!(json["bbox"]["x2"], 3.0);
        assert!(json.get("mask").is_none());
    }

    #[test]
    fn test_model_files() {
        assert_eq!(YoloTask::Detect.model_file(), "yolo11n.onnx");
        assert_eq!(YoloTask::Segment.model_file(), "yolo11n-seg.onnx");
        assert_eq!(YoloTask::Pose.to_string(), "pose");
    }
}
