// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect, classify, pose, segment and video-pose endpoints

pub mod handler;
pub mod request;

pub use handler::{
    classify_handler, detect_handler, pose_handler, segment_handler, video_pose_handler,
};
pub use request::{ClassifyParams, DetectionParams, VideoPoseParams};
