// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Animated image frame sequences for video pose estimation
//!
//! Frames are decoded from GIF containers without transcoding. Any other
//! still image format becomes a one-frame sequence.

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Delay, DynamicImage, Frame, ImageFormat, RgbImage};
use std::io::Cursor;

use super::image_utils::{decode_image_bytes, detect_format, ImageError};

/// Upper bound on frames run through the model per request
pub const MAX_PROCESSED_FRAMES: usize = 300;
pub const DEFAULT_SKIP_FRAMES: usize = 2;
/// Largest accepted video payload after base64 decoding
pub const MAX_VIDEO_SIZE: usize = 64 * 1024 * 1024;

const STILL_FRAME_DELAY_MS: u32 = 100;

#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub image: DynamicImage,
    pub delay: Delay,
}

/// Decode every frame of an animated image
pub fn decode_frames(bytes: &[u8]) -> Result<Vec<VideoFrame>, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    if detect_format(bytes)? != ImageFormat::Gif {
        let (image, _) = decode_image_bytes(bytes)?;
        return Ok(vec![VideoFrame {
            image,
            delay: Delay::from_numer_denom_ms(STILL_FRAME_DELAY_MS, 1),
        }]);
    }

    let decoder = GifDecoder::new(Cursor::new(bytes))
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    if frames.is_empty() {
        return Err(ImageError::DecodeFailed("animation has no frames".to_string()));
    }

    Ok(frames
        .into_iter()
        .map(|frame| {
            let delay = frame.delay();
            VideoFrame {
                image: DynamicImage::ImageRgba8(frame.into_buffer()),
                delay,
            }
        })
        .collect())
}

/// Indices of the frames to process: every `skip`-th, capped
///
/// A skip of 0 is treated as 1.
pub fn select_frames(total: usize, skip: usize) -> Vec<usize> {
    (0..total)
        .step_by(skip.max(1))
        .take(MAX_PROCESSED_FRAMES)
        .collect()
}

/// Encode frames as a looping GIF
pub fn encode_gif(frames: Vec<(RgbImage, Delay)>) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buffer);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| ImageError::EncodeFailed(e.to_string()))?;
        let frames = frames.into_iter().map(|(rgb, delay)| {
            let rgba = DynamicImage::ImageRgb8(rgb).to_rgba8();
            Frame::from_parts(rgba, 0, 0, delay)
        });
        encoder
            .encode_frames(frames)
            .map_err(|e| ImageError::EncodeFailed(e.to_string()))?;
    }
    Ok(buffer)
}
