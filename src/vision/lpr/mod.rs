// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chinese license plate recognition
//!
//! Three stages, all on CPU:
//! - `detection` - YOLO-format plate localisation
//! - `recognition` - CRNN text recognition with greedy CTC decoding
//! - `color` - plate colour from HSV statistics of the crop

pub mod color;
pub mod detection;
pub mod recognition;

use anyhow::Result;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub use color::{plate_color_name, plate_type_name, PLATE_TYPES};
pub use detection::{PlateBox, PlateDetector};
pub use recognition::{PlateText, PlateTextRecognizer};

use super::yolo::BoundingBox;
use super::InferenceError;

/// Model files relative to the models directory
pub const PLATE_DETECT_MODEL: &str = "lpr/plate_detect.onnx";
pub const PLATE_REC_MODEL: &str = "lpr/plate_rec.onnx";
pub const PLATE_KEYS_FILE: &str = "lpr/plate_keys.txt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicensePlate {
    pub plate_number: String,
    pub plate_type: String,
    pub plate_color: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl LicensePlate {
    pub fn new(plate_number: String, type_id: usize, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            plate_number,
            plate_type: plate_type_name(type_id).to_string(),
            plate_color: plate_color_name(type_id).to_string(),
            confidence,
            bbox,
        }
    }
}

/// All plate type names, in type id order
pub fn supported_types() -> Vec<&'static str> {
    PLATE_TYPES.iter().map(|(name, _)| *name).collect()
}

#[derive(Clone, Debug)]
pub struct PlateRecognizer {
    detector: PlateDetector,
    recognizer: PlateTextRecognizer,
}

impl PlateRecognizer {
    /// Whether the model files are present under `models_dir`
    pub fn is_available(models_dir: &Path) -> bool {
        models_dir.join(PLATE_DETECT_MODEL).exists() && models_dir.join(PLATE_REC_MODEL).exists()
    }

    pub fn load(models_dir: &Path) -> Result<Self> {
        let detector = PlateDetector::load(&models_dir.join(PLATE_DETECT_MODEL))?;
        let recognizer = PlateTextRecognizer::load(
            &models_dir.join(PLATE_REC_MODEL),
            &models_dir.join(PLATE_KEYS_FILE),
        )?;
        Ok(Self {
            detector,
            recognizer,
        })
    }

    pub fn recognize(&self, image: &DynamicImage) -> Result<Vec<LicensePlate>, InferenceError> {
        let rgb = image.to_rgb8();
        let mut plates = Vec::new();

        for plate_box in self.detector.detect(image)? {
            let b = plate_box.bbox;
            let x = b.x1.floor().max(0.0) as u32;
            let y = b.y1.floor().max(0.0) as u32;
            let w = (b.width().ceil() as u32).min(rgb.width().saturating_sub(x));
            let h = (b.height().ceil() as u32).min(rgb.height().saturating_sub(y));
            if w == 0 || h == 0 {
                continue;
            }

            let crop = image::imageops::crop_imm(&rgb, x, y, w, h).to_image();
            let text = self.recognizer.recognize(&crop)?;
            if text.text.is_empty() {
                debug!("Plate at {:?} produced no text", b);
                continue;
            }

            let base_color = color::estimate_color(&crop);
            let type_id = color::resolve_plate_type(&text.text, base_color);
            plates.push(LicensePlate::new(text.text, type_id, text.confidence, b));
        }

        Ok(plates)
    }
}
