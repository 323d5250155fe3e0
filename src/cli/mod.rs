// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ServerConfig;

/// Vision gateway server
#[derive(Parser, Debug)]
#[command(name = "vision-gateway")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "REST gateway for local YOLO inference and cloud vision APIs", long_about = None)]
pub struct Cli {
    /// Interface to bind
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory containing yolo11n*.onnx and lpr/ models
    #[arg(long, env = "MODELS_DIR", default_value = "./models")]
    pub models_dir: PathBuf,

    /// Vendor credential key file
    #[arg(long, env = "KEYS_FILE", default_value = "./keys.json")]
    pub keys_file: PathBuf,

    /// TrueType/OpenType font for annotation labels (CJK-capable for plates)
    #[arg(long, env = "FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// Maximum request body in MiB
    #[arg(long, env = "MAX_BODY_MB", default_value_t = 64)]
    pub max_body_mb: usize,

    /// Timeout for vendor API calls in seconds
    #[arg(long, env = "VENDOR_TIMEOUT_SECS", default_value_t = 30)]
    pub vendor_timeout_secs: u64,
}

impl Cli {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            models_dir: self.models_dir,
            keys_file: self.keys_file,
            font_path: self.font_path,
            max_body_bytes: self.max_body_mb.max(1) * 1024 * 1024,
            vendor_timeout: Duration::from_secs(self.vendor_timeout_secs.max(1)),
        }
    }
}
