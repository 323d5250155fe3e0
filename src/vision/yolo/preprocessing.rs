// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image to NCHW tensor conversion for YOLO models

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

/// Square input edge for detect, pose and segment models
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Square input edge for the classification model
pub const CLASSIFY_INPUT_SIZE: u32 = 224;

/// Fill value for the letterbox padding
pub const PAD_VALUE: f32 = 144.0 / 255.0;

/// Scale factor and scaled size that fit `(w0, h0)` inside `(w1, h1)`
pub fn scale_wh(w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
    let r = (w1 / w0).min(h1 / h0);
    (r, (w0 * r).round(), (h0 * r).round())
}

/// Letterboxed model input plus the scale ratio applied to the image
#[derive(Debug, Clone)]
pub struct Letterboxed {
    pub tensor: Array4<f32>,
    pub ratio: f32,
}

/// Resize keeping aspect ratio, anchored top-left, pad the remainder
pub fn letterbox(image: &DynamicImage, width: u32, height: u32, filter: FilterType) -> Letterboxed {
    let (w0, h0) = image.dimensions();
    let (ratio, w_new, h_new) = scale_wh(w0 as f32, h0 as f32, width as f32, height as f32);
    let w_new = (w_new as u32).clamp(1, width);
    let h_new = (h_new as u32).clamp(1, height);

    let resized = image.resize_exact(w_new, h_new, filter).to_rgb8();

    let mut tensor = Array4::from_elem((1, 3, height as usize, width as usize), PAD_VALUE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let [r, g, b] = pixel.0;
        tensor[[0, 0, y, x]] = r as f32 / 255.0;
        tensor[[0, 1, y, x]] = g as f32 / 255.0;
        tensor[[0, 2, y, x]] = b as f32 / 255.0;
    }

    Letterboxed { tensor, ratio }
}

/// Direct resize to the classification input size
pub fn resize_for_classification(image: &DynamicImage, size: u32) -> Array4<f32> {
    let resized = image
        .resize_exact(size, size, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let [r, g, b] = pixel.0;
        tensor[[0, 0, y, x]] = r as f32 / 255.0;
        tensor[[0, 1, y, x]] = g as f32 / 255.0;
        tensor[[0, 2, y, x]] = b as f32 / 255.0;
    }
    tensor
}
