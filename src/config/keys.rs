// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vendor credential key file (`keys.json`)
//!
//! Loaded once at start-up. Sections that are absent from the file fall back
//! to environment variables where a fallback exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Default Tencent Cloud region
pub const DEFAULT_TENCENT_REGION: &str = "ap-guangzhou";

#[derive(Debug, Error)]
pub enum KeysError {
    #[error("Failed to read key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse key file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Baidu-style application credentials (app id + API key + secret key)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCredentials {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: String,
}

impl AppCredentials {
    pub fn new(app_id: &str, api_key: &str, secret_key: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            api_key: api_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// All three values must be present
    pub fn is_configured(&self) -> bool {
        !self.app_id.is_empty() && !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

/// Tencent Cloud API 3.0 credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TencentCredentials {
    #[serde(default)]
    pub secret_id: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub region: Option<String>,
}

impl TencentCredentials {
    pub fn is_configured(&self) -> bool {
        !self.secret_id.is_empty() && !self.secret_key.is_empty()
    }

    pub fn region(&self) -> &str {
        self.region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_TENCENT_REGION)
    }
}

/// Parsed contents of the credential key file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    #[serde(default)]
    pub tencent: TencentCredentials,
    #[serde(default)]
    pub baidu: AppCredentials,
    /// Separate application for face analysis; falls back to `baidu`
    #[serde(default)]
    pub baidu_face: Option<AppCredentials>,
    #[serde(default)]
    pub baidu_ocr: AppCredentials,
    #[serde(default)]
    pub baidu_nlp: AppCredentials,
    #[serde(default)]
    pub baidu_image_search: AppCredentials,

    /// Whether the values came from a key file
    #[serde(skip)]
    pub loaded: bool,
}

impl KeysConfig {
    /// Parse a key file. Fails on I/O or JSON errors.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KeysError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| KeysError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: KeysConfig =
            serde_json::from_str(&raw).map_err(|source| KeysError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.loaded = true;
        Ok(config)
    }

    /// Load the key file if present, then apply environment fallbacks.
    ///
    /// A missing or malformed file is logged and treated as empty.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let config = if path.exists() {
            match Self::load(path) {
                Ok(config) => {
                    info!("Loaded vendor credentials from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️ {}", e);
                    Self::default()
                }
            }
        } else {
            info!(
                "No key file at {}, using environment credentials only",
                path.display()
            );
            Self::default()
        };

        config.with_env_fallback(|key| env::var(key).ok())
    }

    /// Fill empty Tencent and Baidu values from the given lookup
    pub fn with_env_fallback<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut String, key: &str| {
            if slot.is_empty() {
                if let Some(value) = lookup(key) {
                    *slot = value;
                }
            }
        };

        fill(&mut self.tencent.secret_id, "TENCENT_SECRET_ID");
        fill(&mut self.tencent.secret_key, "TENCENT_SECRET_KEY");
        if self.tencent.region.as_deref().map_or(true, str::is_empty) {
            self.tencent.region = lookup("TENCENT_REGION");
        }

        fill(&mut self.baidu.app_id, "BAIDU_APP_ID");
        fill(&mut self.baidu.api_key, "BAIDU_API_KEY");
        fill(&mut self.baidu.secret_key, "BAIDU_SECRET_KEY");

        self
    }

    /// Credentials for face analysis: `baidu_face` when complete, else `baidu`
    pub fn face_credentials(&self) -> &AppCredentials {
        match &self.baidu_face {
            Some(face) if face.is_configured() => face,
            _ => &self.baidu,
        }
    }
}
