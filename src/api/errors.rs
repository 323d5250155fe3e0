// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use tracing::warn;

use super::envelope::Envelope;
use crate::providers::ProviderError;
use crate::vision::{ImageError, InferenceError};

/// Task id used when a request fails before its task is known
pub const UNKNOWN_TASK: &str = "request";

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    /// Local model missing or vendor credentials absent
    ServiceUnavailable(String),
    /// Vendor rejected the call or replied with garbage
    ProviderError(String),
    Timeout(String),
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::ProviderError(_) => 502,
            ApiError::Timeout(_) => 504,
            ApiError::InternalError(_) => 500,
        }
    }

    /// Client-facing message placed in the failure envelope
    pub fn message(&self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::InvalidRequest(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::ProviderError(msg)
            | ApiError::Timeout(msg)
            | ApiError::InternalError(msg) => msg.clone(),
            ApiError::ValidationError { field, message } => format!("{}: {}", field, message),
        }
    }

    pub fn to_envelope(&self, task: &str) -> Envelope {
        Envelope::failure(task, self.message())
    }

    /// Attach the task id of the failing endpoint
    pub fn for_task(self, task: impl Into<String>) -> TaskFailure {
        TaskFailure {
            task: task.into(),
            error: self,
        }
    }

    fn render(&self, task: &str) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!("[{}] {} ({})", task, self, status.as_u16());
        }
        (status, Json(self.to_envelope(task))).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::ProviderError(msg) => write!(f, "Provider error: {}", msg),
            ApiError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.render(UNKNOWN_TASK)
    }
}

/// An [`ApiError`] bound to the task id of the endpoint that raised it
#[derive(Debug)]
pub struct TaskFailure {
    pub task: String,
    pub error: ApiError,
}

impl IntoResponse for TaskFailure {
    fn into_response(self) -> Response {
        self.error.render(&self.task)
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotConfigured { provider } => {
                ApiError::ServiceUnavailable(format!("{} 未配置，请检查密钥文件", provider))
            }
            ProviderError::InvalidInput(msg) => ApiError::InvalidRequest(msg),
            ProviderError::UnsupportedTask { task, .. } => {
                ApiError::InvalidRequest(format!("不支持的 API 类型: {}", task))
            }
            ProviderError::Timeout {
                provider,
                timeout_ms,
            } => ApiError::Timeout(format!("{} 请求超时 ({}ms)", provider, timeout_ms)),
            e @ (ProviderError::Vendor { .. } | ProviderError::Http { .. }) => {
                ApiError::ProviderError(e.to_string())
            }
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::EncodeFailed(msg) => ApiError::InternalError(format!("图像编码失败: {}", msg)),
            other => ApiError::InvalidRequest(format!("无效的图像数据: {}", other)),
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::ModelUnavailable(msg) => {
                ApiError::ServiceUnavailable(format!("模型不可用: {}", msg))
            }
            InferenceError::Image(e) => e.into(),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}
