// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server settings

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings for the gateway
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Directory holding the ONNX models
    pub models_dir: PathBuf,
    /// Path to the vendor key file
    pub keys_file: PathBuf,
    /// TrueType font used for annotation labels
    pub font_path: Option<PathBuf>,
    /// Maximum accepted request body
    pub max_body_bytes: usize,
    /// Timeout applied to every vendor HTTP call
    pub vendor_timeout: Duration,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port).parse()?;
        Ok(addr)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            models_dir: PathBuf::from("./models"),
            keys_file: PathBuf::from("./keys.json"),
            font_path: None,
            max_body_bytes: 64 * 1024 * 1024,
            vendor_timeout: Duration::from_secs(30),
        }
    }
}
