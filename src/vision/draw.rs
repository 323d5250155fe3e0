// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotated image rendering for detection, pose, segmentation and plates

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{info, warn};

use super::labels::SKELETON;
use super::lpr::LicensePlate;
use super::yolo::{BoundingBox, Detection, PoseResult, SegmentResult};

const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_PADDING: i32 = 3;
const BOX_THICKNESS: i32 = 2;
const KEYPOINT_RADIUS: i32 = 4;
const KEYPOINT_MIN_CONFIDENCE: f32 = 0.5;
const MASK_ALPHA: f32 = 0.4;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const PLATE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Per-class colours, cycled by class id
pub const PALETTE: [[u8; 3]; 12] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [146, 204, 23],
    [61, 219, 134],
    [26, 147, 52],
    [0, 212, 187],
    [44, 153, 168],
    [0, 194, 255],
];

pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Draws boxes, labels, skeletons and masks onto copies of input images
///
/// Without a font only the geometry is drawn.
#[derive(Clone, Default)]
pub struct Annotator {
    font: Option<FontArc>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl Annotator {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Load a TTF/OTF font for labels; failures fall back to boxes only
    pub fn from_font_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        let font = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| FontArc::try_from_vec(bytes).map_err(|e| e.to_string()));

        match font {
            Ok(font) => {
                info!("Loaded label font from {}", path.display());
                Self { font: Some(font) }
            }
            Err(e) => {
                warn!("⚠️ Failed to load font {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn draw_detections(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        for det in detections {
            let label = format!("{} {:.2}", det.class_name, det.confidence);
            self.draw_labeled_box(&mut canvas, &det.bbox, &label, class_color(det.class_id));
        }
        canvas
    }

    pub fn draw_segments(&self, image: &DynamicImage, segments: &[SegmentResult]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        for seg in segments {
            let color = class_color(seg.detection.class_id);
            if let Some(mask) = &seg.mask {
                blend_mask(&mut canvas, mask, color);
            }
        }
        for seg in segments {
            let det = &seg.detection;
            let label = format!("{} {:.2}", det.class_name, det.confidence);
            self.draw_labeled_box(&mut canvas, &det.bbox, &label, class_color(det.class_id));
        }
        canvas
    }

    pub fn draw_poses(&self, image: &DynamicImage, poses: &[PoseResult]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        self.draw_poses_mut(&mut canvas, poses);
        canvas
    }

    /// In-place variant used for video frames
    pub fn draw_poses_mut(&self, canvas: &mut RgbImage, poses: &[PoseResult]) {
        for pose in poses {
            if let Some(bbox) = &pose.bbox {
                let label = format!("person {}", pose.person_id);
                self.draw_labeled_box(canvas, bbox, &label, class_color(0));
            }

            for (i, &(a, b)) in SKELETON.iter().enumerate() {
                let (Some(ka), Some(kb)) = (pose.keypoints.get(a), pose.keypoints.get(b)) else {
                    continue;
                };
                if ka.confidence < KEYPOINT_MIN_CONFIDENCE || kb.confidence < KEYPOINT_MIN_CONFIDENCE
                {
                    continue;
                }
                let color = class_color(i + 1);
                for offset in [-0.5f32, 0.5] {
                    draw_line_segment_mut(
                        canvas,
                        (ka.x + offset, ka.y + offset),
                        (kb.x + offset, kb.y + offset),
                        color,
                    );
                }
            }

            for (i, kp) in pose.keypoints.iter().enumerate() {
                if kp.confidence < KEYPOINT_MIN_CONFIDENCE {
                    continue;
                }
                draw_filled_circle_mut(
                    canvas,
                    (kp.x.round() as i32, kp.y.round() as i32),
                    KEYPOINT_RADIUS,
                    class_color(i),
                );
            }
        }
    }

    pub fn draw_plates(&self, image: &DynamicImage, plates: &[LicensePlate]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        for plate in plates {
            self.draw_labeled_box(&mut canvas, &plate.bbox, &plate.plate_number, PLATE_COLOR);
        }
        canvas
    }

    fn draw_labeled_box(&self, canvas: &mut RgbImage, bbox: &BoundingBox, label: &str, color: Rgb<u8>) {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        if w == 0 || h == 0 {
            return;
        }

        let x1 = (bbox.x1.floor() as i32).clamp(0, w - 1);
        let y1 = (bbox.y1.floor() as i32).clamp(0, h - 1);
        let x2 = (bbox.x2.ceil() as i32).clamp(0, w - 1);
        let y2 = (bbox.y2.ceil() as i32).clamp(0, h - 1);
        if x1 >= x2 || y1 >= y2 {
            return;
        }

        for t in 0..BOX_THICKNESS {
            let bw = x2 - x1 - 2 * t;
            let bh = y2 - y1 - 2 * t;
            if bw <= 0 || bh <= 0 {
                break;
            }
            let rect = Rect::at(x1 + t, y1 + t).of_size(bw as u32 + 1, bh as u32 + 1);
            draw_hollow_rect_mut(canvas, rect, color);
        }

        let Some(font) = &self.font else {
            return;
        };

        let scale = PxScale::from(LABEL_FONT_SIZE);
        let (text_w, text_h) = text_size(scale, font, label);
        let label_w = (text_w as i32 + 2 * LABEL_PADDING).min(w - x1);
        let label_h = text_h as i32 + 2 * LABEL_PADDING;
        // Above the box when there is room, otherwise inside its top edge
        let label_y = if y1 >= label_h { y1 - label_h } else { y1 };

        if label_w > 0 && label_h > 0 {
            let rect = Rect::at(x1, label_y).of_size(label_w as u32, label_h as u32);
            draw_filled_rect_mut(canvas, rect, color);
            draw_text_mut(
                canvas,
                TEXT_COLOR,
                x1 + LABEL_PADDING,
                label_y + LABEL_PADDING,
                scale,
                font,
                label,
            );
        }
    }
}

fn blend_mask(canvas: &mut RgbImage, mask: &image::GrayImage, color: Rgb<u8>) {
    if mask.dimensions() != canvas.dimensions() {
        return;
    }
    for (pixel, m) in canvas.pixels_mut().zip(mask.pixels()) {
        if m.0[0] < 128 {
            continue;
        }
        for c in 0..3 {
            let blended = pixel.0[c] as f32 * (1.0 - MASK_ALPHA) + color.0[c] as f32 * MASK_ALPHA;
            pixel.0[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}
