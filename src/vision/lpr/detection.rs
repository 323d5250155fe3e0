// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate localisation with a YOLO-format detector

use anyhow::Result;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;

use crate::vision::session::OnnxSession;
use crate::vision::yolo::postprocessing::{
    decode_predictions, non_max_suppression, DecodeParams, HeadLayout,
};
use crate::vision::yolo::preprocessing::{letterbox, DEFAULT_INPUT_SIZE};
use crate::vision::yolo::BoundingBox;
use crate::vision::InferenceError;

pub const PLATE_CONF_THRESHOLD: f32 = 0.3;
pub const PLATE_IOU_THRESHOLD: f32 = 0.45;

/// Located plate region in original pixels
#[derive(Debug, Clone, PartialEq)]
pub struct PlateBox {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

#[derive(Clone, Debug)]
pub struct PlateDetector {
    session: OnnxSession,
}

impl PlateDetector {
    pub fn load(model_path: &Path) -> Result<Self> {
        Ok(Self {
            session: OnnxSession::load(model_path, "Plate detection")?,
        })
    }

    /// Plate boxes, best first; all classes are treated as "plate"
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<PlateBox>, InferenceError> {
        let lb = letterbox(image, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE, FilterType::Triangle);
        let outputs = self.session.run(lb.tensor, 1)?;
        let mut candidates = decode_predictions(
            outputs[0].view(),
            HeadLayout::Detect,
            DecodeParams {
                conf_threshold: PLATE_CONF_THRESHOLD,
                ratio: lb.ratio,
                image_width: image.width() as f32,
                image_height: image.height() as f32,
            },
        )?;
        // Single vs double row plates must still suppress each other
        for c in candidates.iter_mut() {
            c.class_id = 0;
        }

        Ok(non_max_suppression(candidates, PLATE_IOU_THRESHOLD)
            .into_iter()
            .filter(|c| c.bbox.width() >= 1.0 && c.bbox.height() >= 1.0)
            .map(|c| PlateBox {
                bbox: c.bbox,
                confidence: c.confidence,
            })
            .collect())
    }
}
