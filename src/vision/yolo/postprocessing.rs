// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of raw YOLO head output
//!
//! Output layout is `[1, C, N]` with `C = 4 + nc + extra` (cx, cy, w, h, class
//! scores, then keypoints or mask coefficients). Some exports transpose to
//! `[1, N, C]`; both are accepted.

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use ndarray::{Array1, Array2, ArrayView3, ArrayViewD, Axis, Ix3};

use super::preprocessing::scale_wh;
use super::BoundingBox;
use crate::vision::InferenceError;

pub const CXYWH_OFFSET: usize = 4;
pub const KPT_STEP: usize = 3;
pub const NUM_KEYPOINTS: usize = 17;
pub const NUM_MASK_COEFS: usize = 32;

/// Extra channels carried by each anchor after the class scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadLayout {
    Detect,
    Pose { keypoints: usize },
    Segment { coefs: usize },
}

impl HeadLayout {
    pub fn extra_channels(&self) -> usize {
        match self {
            HeadLayout::Detect => 0,
            HeadLayout::Pose { keypoints } => keypoints * KPT_STEP,
            HeadLayout::Segment { coefs } => *coefs,
        }
    }
}

/// One anchor that passed the confidence threshold
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
    /// `(x, y, confidence)` in original pixels
    pub keypoints: Vec<(f32, f32, f32)>,
    pub mask_coefs: Vec<f32>,
}

/// Mapping from model input space back to the original image
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    pub conf_threshold: f32,
    pub ratio: f32,
    pub image_width: f32,
    pub image_height: f32,
}

/// Decode anchors above the confidence threshold
pub fn decode_predictions(
    output: ArrayViewD<'_, f32>,
    layout: HeadLayout,
    params: DecodeParams,
) -> Result<Vec<Candidate>, InferenceError> {
    let preds = output
        .into_dimensionality::<Ix3>()
        .map_err(|e| InferenceError::UnexpectedOutput(format!("prediction rank: {}", e)))?;
    let (_, d1, d2) = preds.dim();
    let preds = preds.index_axis_move(Axis(0), 0);
    // Channel axis is the shorter one (84 vs 8400)
    let preds = if d1 <= d2 { preds } else { preds.reversed_axes() };

    let channels = preds.shape()[0];
    let extra = layout.extra_channels();
    if channels <= CXYWH_OFFSET + extra {
        return Err(InferenceError::UnexpectedOutput(format!(
            "{} channels cannot hold boxes, classes and {} extra values",
            channels, extra
        )));
    }
    let nc = channels - CXYWH_OFFSET - extra;
    let ratio = if params.ratio > 0.0 { params.ratio } else { 1.0 };

    let mut candidates = Vec::new();
    for pred in preds.axis_iter(Axis(1)) {
        let (class_id, score) = pred
            .iter()
            .skip(CXYWH_OFFSET)
            .take(nc)
            .copied()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, s)| {
                if s > best.1 {
                    (i, s)
                } else {
                    best
                }
            });

        if score < params.conf_threshold {
            continue;
        }

        let cx = pred[0] / ratio;
        let cy = pred[1] / ratio;
        let w = pred[2] / ratio;
        let h = pred[3] / ratio;
        let bbox = BoundingBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
            .clamp_to(params.image_width, params.image_height);

        let tail = CXYWH_OFFSET + nc;
        let keypoints = match layout {
            HeadLayout::Pose { keypoints } => (0..keypoints)
                .map(|k| {
                    let base = tail + k * KPT_STEP;
                    let x = (pred[base] / ratio).clamp(0.0, params.image_width);
                    let y = (pred[base + 1] / ratio).clamp(0.0, params.image_height);
                    (x, y, pred[base + 2].clamp(0.0, 1.0))
                })
                .collect(),
            _ => Vec::new(),
        };
        let mask_coefs = match layout {
            HeadLayout::Segment { coefs } => {
                pred.iter().skip(tail).take(coefs).copied().collect()
            }
            _ => Vec::new(),
        };

        candidates.push(Candidate {
            class_id,
            confidence: score.clamp(0.0, 1.0),
            bbox,
            keypoints,
            mask_coefs,
        });
    }

    Ok(candidates)
}

/// Class-aware greedy non-maximum suppression
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Build a full-resolution instance mask from prototype masks
///
/// `proto` is `[nm, mh, mw]`. The result has the original image size, with
/// everything outside `bbox` zeroed.
pub fn build_mask(
    proto: ArrayView3<'_, f32>,
    coefs: &[f32],
    bbox: &BoundingBox,
    input_size: (u32, u32),
    image_size: (u32, u32),
) -> Result<GrayImage, InferenceError> {
    let (nm, mh, mw) = proto.dim();
    if coefs.len() != nm {
        return Err(InferenceError::UnexpectedOutput(format!(
            "{} mask coefficients for {} prototypes",
            coefs.len(),
            nm
        )));
    }

    let coefs = Array1::from(coefs.to_vec());
    let proto: Array2<f32> = proto
        .to_owned()
        .into_shape_with_order((nm, mh * mw))
        .map_err(|e| InferenceError::UnexpectedOutput(e.to_string()))?;
    let logits = coefs.dot(&proto);

    let pixels: Vec<u8> = logits
        .iter()
        .map(|v| (255.0 / (1.0 + (-v).exp())).round() as u8)
        .collect();
    let mask: GrayImage = ImageBuffer::from_raw(mw as u32, mh as u32, pixels).ok_or_else(|| {
        InferenceError::UnexpectedOutput("mask buffer size mismatch".to_string())
    })?;

    // Prototype grid covers the padded input; keep the image part only
    let (img_w, img_h) = image_size;
    let (_, scaled_w, scaled_h) = scale_wh(
        img_w as f32,
        img_h as f32,
        input_size.0 as f32,
        input_size.1 as f32,
    );
    let crop_w = ((scaled_w / input_size.0 as f32) * mw as f32).round().clamp(1.0, mw as f32);
    let crop_h = ((scaled_h / input_size.1 as f32) * mh as f32).round().clamp(1.0, mh as f32);
    let cropped = imageops::crop_imm(&mask, 0, 0, crop_w as u32, crop_h as u32).to_image();
    let mut full = imageops::resize(&cropped, img_w, img_h, FilterType::Triangle);

    for (x, y, pixel) in full.enumerate_pixels_mut() {
        let (fx, fy) = (x as f32, y as f32);
        if fx < bbox.x1 || fx > bbox.x2 || fy < bbox.y1 || fy > bbox.y2 {
            *pixel = Luma([0]);
        }
    }

    Ok(full)
}

/// Softmax unless the vector already looks like a probability distribution
pub fn normalize_probabilities(values: &[f32]) -> Vec<f32> {
    let sum: f32 = values.iter().sum();
    let in_range = values.iter().all(|v| (0.0..=1.0).contains(v));
    if in_range && (sum - 1.0).abs() < 0.01 {
        return values.to_vec();
    }

    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Indices and scores of the `k` highest probabilities, best first
pub fn top_k(probs: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed.truncate(k);
    indexed
}
