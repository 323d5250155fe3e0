// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate text recognition (CRNN + greedy CTC decode)

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::{Array4, ArrayViewD, IxDyn};
use std::path::Path;
use tracing::{debug, info};

use crate::vision::session::OnnxSession;
use crate::vision::yolo::postprocessing::normalize_probabilities;
use crate::vision::InferenceError;

pub const REC_INPUT_HEIGHT: u32 = 48;
pub const REC_INPUT_WIDTH: u32 = 160;

/// Character set used when no key file ships with the model; index 0 is the CTC blank
pub const DEFAULT_PLATE_CHARSET: &str = "#京沪津渝冀晋蒙辽吉黑苏浙皖闽赣鲁豫鄂湘粤桂琼川贵云藏陕甘青宁新学警港澳挂使领民航危0123456789ABCDEFGHJKLMNPQRSTUVWXYZ险品";

/// Recognised plate text
#[derive(Debug, Clone, PartialEq)]
pub struct PlateText {
    pub text: String,
    pub confidence: f32,
}

#[derive(Clone, Debug)]
pub struct PlateTextRecognizer {
    session: OnnxSession,
    dictionary: Vec<char>,
}

impl PlateTextRecognizer {
    /// Load the recognizer; `keys_path` lists one character per line
    pub fn load(model_path: &Path, keys_path: &Path) -> Result<Self> {
        let session = OnnxSession::load(model_path, "Plate recognition")?;

        let dictionary = if keys_path.exists() {
            load_dictionary(keys_path)?
        } else {
            debug!(
                "No plate key file at {}, using built-in charset",
                keys_path.display()
            );
            DEFAULT_PLATE_CHARSET.chars().collect()
        };
        info!("Plate dictionary has {} entries", dictionary.len());

        Ok(Self {
            session,
            dictionary,
        })
    }

    pub fn recognize(&self, crop: &RgbImage) -> Result<PlateText, InferenceError> {
        let input = preprocess(crop);
        let outputs = self.session.run(input, 1)?;
        ctc_decode(outputs[0].view(), &self.dictionary)
    }
}

/// Dictionary file with the blank prepended at index 0
fn load_dictionary(path: &Path) -> Result<Vec<char>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plate keys {}", path.display()))?;

    let mut dictionary = vec![' '];
    dictionary.extend(content.lines().filter_map(|line| line.chars().next()));
    Ok(dictionary)
}

/// Resize to 48x160 and scale to `[-1, 1]`, NCHW
pub fn preprocess(crop: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(crop, REC_INPUT_WIDTH, REC_INPUT_HEIGHT, FilterType::Triangle);
    let mut tensor = Array4::zeros((1, 3, REC_INPUT_HEIGHT as usize, REC_INPUT_WIDTH as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel.0[c] as f32 / 255.0 - 0.5) / 0.5;
        }
    }
    tensor
}

/// Greedy CTC decode of a `[1, T, C]` or `[T, C]` output
///
/// Blank is index 0; consecutive repeats collapse unless split by a blank.
pub fn ctc_decode(output: ArrayViewD<'_, f32>, dictionary: &[char]) -> Result<PlateText, InferenceError> {
    let shape = output.shape().to_vec();
    let (seq_len, num_classes) = match shape.as_slice() {
        [1, t, c] => (*t, *c),
        [t, c] => (*t, *c),
        _ => {
            return Err(InferenceError::UnexpectedOutput(format!(
                "plate recognition output shape {:?}",
                shape
            )))
        }
    };

    let mut text = String::new();
    let mut confidences = Vec::new();
    let mut prev: Option<usize> = None;

    for t in 0..seq_len {
        let row: Vec<f32> = (0..num_classes)
            .map(|c| {
                if shape.len() == 3 {
                    output[IxDyn(&[0, t, c])]
                } else {
                    output[IxDyn(&[t, c])]
                }
            })
            .collect();
        let probs = normalize_probabilities(&row);

        let (best, prob) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |acc, (i, p)| if p > acc.1 { (i, p) } else { acc });

        if best != 0 && Some(best) != prev {
            if let Some(&ch) = dictionary.get(best) {
                text.push(ch);
                confidences.push(prob);
            }
        }
        prev = if best == 0 { None } else { Some(best) };
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    Ok(PlateText {
        text,
        confidence: confidence.clamp(0.0, 1.0),
    })
}
