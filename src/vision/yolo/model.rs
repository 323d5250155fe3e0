// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO11 ONNX session wrapper

use anyhow::Result;
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::{Axis, Ix4};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::postprocessing::{
    build_mask, decode_predictions, non_max_suppression, normalize_probabilities, top_k,
    DecodeParams, HeadLayout, NUM_KEYPOINTS, NUM_MASK_COEFS,
};
use super::preprocessing::{
    letterbox, resize_for_classification, CLASSIFY_INPUT_SIZE, DEFAULT_INPUT_SIZE,
};
use super::{Classification, Detection, Keypoint, PoseResult, SegmentResult, YoloTask};
use crate::vision::labels::{class_name, translate_class_name, COCO_CLASSES, KEYPOINT_NAMES};
use crate::vision::session::OnnxSession;
use crate::vision::InferenceError;

/// A loaded YOLO model for one task
///
/// Runs on CPU. The session is shared behind a mutex so one model instance
/// serves all requests.
#[derive(Clone)]
pub struct YoloModel {
    task: YoloTask,
    session: OnnxSession,
    input_size: u32,
    class_names: Arc<Vec<String>>,
}

impl std::fmt::Debug for YoloModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloModel")
            .field("task", &self.task)
            .field("input_size", &self.input_size)
            .field("classes", &self.class_names.len())
            .finish_non_exhaustive()
    }
}

/// Built-in vocabulary when no `<model>.names.txt` sits next to the model
fn default_class_names(task: YoloTask) -> Vec<String> {
    match task {
        YoloTask::Detect | YoloTask::Segment => {
            COCO_CLASSES.iter().map(|s| s.to_string()).collect()
        }
        YoloTask::Pose => vec!["person".to_string()],
        YoloTask::Classify => Vec::new(),
    }
}

impl YoloModel {
    /// Load a model file for `task`
    ///
    /// Class names come from `<model>.names.txt` when present.
    pub fn load<P: AsRef<Path>>(task: YoloTask, model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let session = OnnxSession::load(model_path, &format!("YOLO {}", task))?;

        let names_path = model_path.with_extension("names.txt");
        let class_names = crate::vision::labels::load_class_names(&names_path)
            .unwrap_or_else(|| default_class_names(task));

        let input_size = match task {
            YoloTask::Classify => CLASSIFY_INPUT_SIZE,
            _ => DEFAULT_INPUT_SIZE,
        };

        info!(
            "✅ YOLO {} model loaded ({} classes, {}px input)",
            task,
            class_names.len(),
            input_size
        );

        Ok(Self {
            task,
            session,
            input_size,
            class_names: Arc::new(class_names),
        })
    }

    pub fn task(&self) -> YoloTask {
        self.task
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn ensure_task(&self, expected: YoloTask) -> Result<(), InferenceError> {
        if self.task != expected {
            return Err(InferenceError::Runtime(format!(
                "{} model cannot run {}",
                self.task, expected
            )));
        }
        Ok(())
    }

    fn decode_params(&self, image: &DynamicImage, conf: f32, ratio: f32) -> DecodeParams {
        DecodeParams {
            conf_threshold: conf,
            ratio,
            image_width: image.width() as f32,
            image_height: image.height() as f32,
        }
    }

    fn to_detection(&self, class_id: usize, confidence: f32, bbox: super::BoundingBox) -> Detection {
        Detection {
            class_id,
            class_name: class_name(&self.class_names, class_id),
            confidence,
            bbox,
        }
    }

    /// Object detection
    pub fn detect(
        &self,
        image: &DynamicImage,
        conf: f32,
        iou: f32,
    ) -> Result<Vec<Detection>, InferenceError> {
        self.ensure_task(YoloTask::Detect)?;

        let lb = letterbox(image, self.input_size, self.input_size, FilterType::Triangle);
        let outputs = self.session.run(lb.tensor, 1)?;
        let candidates = decode_predictions(
            outputs[0].view(),
            HeadLayout::Detect,
            self.decode_params(image, conf, lb.ratio),
        )?;

        let detections: Vec<Detection> = non_max_suppression(candidates, iou)
            .into_iter()
            .map(|c| self.to_detection(c.class_id, c.confidence, c.bbox))
            .collect();

        debug!("Detect: {} objects", detections.len());
        Ok(detections)
    }

    /// Pose estimation with 17 COCO keypoints per person
    pub fn pose(
        &self,
        image: &DynamicImage,
        conf: f32,
        iou: f32,
    ) -> Result<Vec<PoseResult>, InferenceError> {
        self.ensure_task(YoloTask::Pose)?;

        let lb = letterbox(image, self.input_size, self.input_size, FilterType::Triangle);
        let outputs = self.session.run(lb.tensor, 1)?;
        let candidates = decode_predictions(
            outputs[0].view(),
            HeadLayout::Pose {
                keypoints: NUM_KEYPOINTS,
            },
            self.decode_params(image, conf, lb.ratio),
        )?;

        let poses = non_max_suppression(candidates, iou)
            .into_iter()
            .enumerate()
            .map(|(person_id, c)| PoseResult {
                person_id,
                bbox: Some(c.bbox),
                keypoints: c
                    .keypoints
                    .iter()
                    .zip(KEYPOINT_NAMES.iter())
                    .map(|(&(x, y, confidence), name)| Keypoint {
                        name: name.to_string(),
                        x,
                        y,
                        confidence,
                    })
                    .collect(),
            })
            .collect();

        Ok(poses)
    }

    /// Instance segmentation
    pub fn segment(
        &self,
        image: &DynamicImage,
        conf: f32,
        iou: f32,
    ) -> Result<Vec<SegmentResult>, InferenceError> {
        self.ensure_task(YoloTask::Segment)?;

        let lb = letterbox(image, self.input_size, self.input_size, FilterType::CatmullRom);
        let outputs = self.session.run(lb.tensor, 2)?;
        let candidates = decode_predictions(
            outputs[0].view(),
            HeadLayout::Segment {
                coefs: NUM_MASK_COEFS,
            },
            self.decode_params(image, conf, lb.ratio),
        )?;

        let protos = outputs[1]
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|e| InferenceError::UnexpectedOutput(format!("prototype rank: {}", e)))?;
        let proto = protos.index_axis(Axis(0), 0);

        let mut segments = Vec::new();
        for c in non_max_suppression(candidates, iou) {
            let mask = build_mask(
                proto.view(),
                &c.mask_coefs,
                &c.bbox,
                (self.input_size, self.input_size),
                (image.width(), image.height()),
            )?;
            segments.push(SegmentResult {
                detection: self.to_detection(c.class_id, c.confidence, c.bbox),
                mask: Some(mask),
            });
        }

        Ok(segments)
    }

    /// Image classification, best `top_k` classes first
    pub fn classify(
        &self,
        image: &DynamicImage,
        top: usize,
    ) -> Result<Vec<Classification>, InferenceError> {
        self.ensure_task(YoloTask::Classify)?;

        let tensor = resize_for_classification(image, self.input_size);
        let outputs = self.session.run(tensor, 1)?;
        let scores: Vec<f32> = outputs[0].iter().copied().collect();
        if scores.is_empty() {
            return Err(InferenceError::UnexpectedOutput(
                "empty classification output".to_string(),
            ));
        }

        let probs = normalize_probabilities(&scores);
        let k = top.clamp(1, probs.len());

        Ok(top_k(&probs, k)
            .into_iter()
            .map(|(class_id, confidence)| {
                let name = class_name(&self.class_names, class_id);
                Classification {
                    class_id,
                    class_name_cn: translate_class_name(&name),
                    class_name: name,
                    confidence: confidence.clamp(0.0, 1.0),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_model() {
        let err = YoloModel::load(YoloTask::Detect, "/nonexistent/yolo11n.onnx").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_default_class_names() {
        assert_eq!(default_class_names(YoloTask::Detect).len(), 80);
        assert_eq!(default_class_names(YoloTask::Pose), vec!["person"]);
        assert!(default_class_names(YoloTask::Classify).is_empty());
    }
}
