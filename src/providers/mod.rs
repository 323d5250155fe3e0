// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote vision vendors behind one adapter trait
//!
//! Each adapter turns a uniform [`ProviderInput`] into the vendor's call shape
//! and reshapes the vendor reply into the `data` payload of a response
//! envelope. Nothing is retried.

pub mod baidu;
pub mod baidu_free;
pub mod tencent;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::vision::image_utils::{decode_base64_bytes, strip_data_url, ImageError, MAX_IMAGE_SIZE};

/// Maximum decoded speech payload (10MB)
pub const MAX_AUDIO_SIZE: usize = 10 * 1024 * 1024;

pub use baidu::BaiduProvider;
pub use baidu_free::BaiduFreeProvider;
pub use tencent::TencentProvider;

/// Operations a vendor adapter can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderTask {
    Detect,
    Label,
    Car,
    Classify,
    Face,
    Ocr,
    Formula,
    DictPen,
    Homework,
    QuestionSegment,
    Speech,
    ImageSearch,
    ImageAdd,
    ImageDelete,
}

impl ProviderTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTask::Detect => "detect",
            ProviderTask::Label => "label",
            ProviderTask::Car => "car",
            ProviderTask::Classify => "classify",
            ProviderTask::Face => "face",
            ProviderTask::Ocr => "ocr",
            ProviderTask::Formula => "formula",
            ProviderTask::DictPen => "dict_pen",
            ProviderTask::Homework => "homework",
            ProviderTask::QuestionSegment => "question_segment",
            ProviderTask::Speech => "speech",
            ProviderTask::ImageSearch => "image_search",
            ProviderTask::ImageAdd => "image_add",
            ProviderTask::ImageDelete => "image_delete",
        }
    }
}

impl fmt::Display for ProviderTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderTask {
    type Err = ProviderError;

    /// Parse an `api_type` value
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let task = match s.trim().to_ascii_lowercase().as_str() {
            "detect" => ProviderTask::Detect,
            "label" => ProviderTask::Label,
            "car" => ProviderTask::Car,
            "classify" => ProviderTask::Classify,
            "face" => ProviderTask::Face,
            "ocr" => ProviderTask::Ocr,
            "formula" => ProviderTask::Formula,
            "dict_pen" => ProviderTask::DictPen,
            "homework" => ProviderTask::Homework,
            "question_segment" => ProviderTask::QuestionSegment,
            "speech" => ProviderTask::Speech,
            "image_search" => ProviderTask::ImageSearch,
            "image_add" => ProviderTask::ImageAdd,
            "image_delete" => ProviderTask::ImageDelete,
            other => return Err(ProviderError::InvalidInput(format!("不支持的 API 类型: {}", other))),
        };
        Ok(task)
    }
}

/// Uniform request handed to an adapter
#[derive(Debug, Clone, Default)]
pub struct ProviderInput {
    pub image_base64: Option<String>,
    pub audio_base64: Option<String>,
    pub language: Option<String>,
    pub search_type: Option<String>,
    pub brief: Option<String>,
    pub cont_sign: Option<String>,
}

impl ProviderInput {
    pub fn image(image_base64: impl Into<String>) -> Self {
        Self {
            image_base64: Some(image_base64.into()),
            ..Default::default()
        }
    }

    /// Image payload checked as base64, normalised for the vendor call
    ///
    /// The `data:` prefix and any line breaks are removed.
    pub fn require_image(&self) -> Result<String, ProviderError> {
        checked_base64(self.image_base64.as_deref(), "image_base64", MAX_IMAGE_SIZE)
            .map(|(encoded, _)| encoded)
    }

    /// Normalised audio payload and its decoded length in bytes
    pub fn require_audio(&self) -> Result<(String, usize), ProviderError> {
        checked_base64(self.audio_base64.as_deref(), "audio_base64", MAX_AUDIO_SIZE)
    }
}

fn checked_base64(
    value: Option<&str>,
    field: &str,
    max_size: usize,
) -> Result<(String, usize), ProviderError> {
    let missing = || ProviderError::InvalidInput(format!("缺少 {} 参数", field));
    let payload = value.map(strip_data_url).filter(|s| !s.is_empty()).ok_or_else(missing)?;

    let len = match decode_base64_bytes(payload, max_size) {
        Ok(bytes) => bytes.len(),
        Err(ImageError::EmptyData) => return Err(missing()),
        Err(e) => {
            return Err(ProviderError::InvalidInput(format!("{} 解码失败: {}", field, e)));
        }
    };

    let encoded = if payload.contains(char::is_whitespace) {
        payload.chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        payload.to_string()
    };
    Ok((encoded, len))
}

/// Adapter result, fed straight into the response envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderOutput {
    pub task: String,
    pub message: String,
    pub data: Value,
}

impl ProviderOutput {
    pub fn new(task: impl Into<String>, message: impl Into<String>, data: Value) -> Self {
        Self {
            task: task.into(),
            message: message.into(),
            data,
        }
    }
}

/// Errors that can occur while calling a vendor
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials for the adapter are missing
    #[error("{provider} is not configured")]
    NotConfigured { provider: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vendor replied with an error object
    #[error("{provider} error {code}: {message}")]
    Vendor {
        provider: String,
        code: String,
        message: String,
    },

    /// Transport failure or non-success HTTP status
    #[error("HTTP error from {provider}: {message}")]
    Http { provider: String, message: String },

    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("{provider} does not support {task}")]
    UnsupportedTask { provider: String, task: String },
}

/// Trait for remote vision vendors
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name used for routing and logging
    fn name(&self) -> &'static str;

    /// Check if credentials are present
    fn is_configured(&self) -> bool;

    /// Tasks this adapter accepts
    fn supported_tasks(&self) -> &'static [ProviderTask];

    fn supports(&self, task: ProviderTask) -> bool {
        self.supported_tasks().contains(&task)
    }

    /// Task id reported in the response envelope
    fn task_id(&self, task: ProviderTask) -> String {
        format!("{}_{}", self.name(), task)
    }

    /// Run one vendor call
    async fn analyze(
        &self,
        task: ProviderTask,
        input: &ProviderInput,
    ) -> Result<ProviderOutput, ProviderError>;
}

/// Adapters by name
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Arc<dyn VisionProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn VisionProvider>) {
        self.providers.insert(provider.name(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn VisionProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

/// HTTP client shared by an adapter's calls
pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("⚠️ Failed to build HTTP client with timeout: {}", e);
            Client::new()
        })
}

/// Send a request and parse the JSON body, mapping transport and status errors
pub(crate) async fn send_json(
    provider: &str,
    timeout: Duration,
    request: RequestBuilder,
) -> Result<Value, ProviderError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::Timeout {
                provider: provider.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
        } else {
            ProviderError::Http {
                provider: provider.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    let status = response.status();

    if status == 429 {
        return Err(ProviderError::Vendor {
            provider: provider.to_string(),
            code: "429".to_string(),
            message: "rate limited".to_string(),
        });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::NotConfigured {
            provider: provider.to_string(),
        });
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ProviderError::Http {
            provider: provider.to_string(),
            message: format!("status {}: {}", status.as_u16(), message),
        });
    }

    let body: Value = response.json().await.map_err(|e| ProviderError::Http {
        provider: provider.to_string(),
        message: format!("JSON parse error: {}", e),
    })?;
    debug!("[{}] raw response: {}", provider, body);
    Ok(body)
}

/// Parse a vendor JSON value into a typed response
pub(crate) fn parse_response<T: serde::de::DeserializeOwned>(
    provider: &str,
    value: Value,
) -> Result<T, ProviderError> {
    serde_json::from_value(value).map_err(|e| ProviderError::Http {
        provider: provider.to_string(),
        message: format!("unexpected response shape: {}", e),
    })
}
