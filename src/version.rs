// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the vision gateway

/// Full version string with feature description
pub const VERSION: &str = "v2.0.0-vision-gateway-2025-11-02";

/// Semantic version number
pub const VERSION_NUMBER: &str = "2.0.0";

/// Major version number
pub const VERSION_MAJOR: u32 = 2;

/// Minor version number
pub const VERSION_MINOR: u32 = 0;

/// Patch version number
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2025-11-02";

/// Service banner returned from `GET /`
pub const SERVICE_NAME: &str = "YOLO11 视觉识别 API 服务";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolo-detect",
    "yolo-classify",
    "scene-analysis",
    "yolo-pose",
    "yolo-segment",
    "video-pose",
    "license-plate-recognition",
    "tencent-tiia",
    "baidu-ai",
    "baidu-free",
    "multipart-upload",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Vision Gateway {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
