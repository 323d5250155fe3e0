// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request body extraction shared by every POST endpoint
//!
//! Bodies are either a JSON object or a multipart form. File parts named
//! `file`, `image`, `audio` or `video` are base64-encoded into
//! `<name>_base64`; other parts become scalar fields.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use axum_extra::extract::Multipart;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Number, Value};
use tracing::debug;

use super::errors::ApiError;
use crate::providers::ProviderInput;

const FILE_FIELDS: [&str; 4] = ["file", "image", "audio", "video"];

/// Scalar options plus base64 payloads of one request
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    fields: Map<String, Value>,
}

impl TaskInput {
    /// Build from a JSON object; other values give an empty input
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Non-empty string field
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn payload(&self, key: &str) -> Option<&str> {
        self.str(key).or_else(|| self.str("file_base64"))
    }

    pub fn image_base64(&self) -> Option<&str> {
        self.payload("image_base64")
    }

    pub fn audio_base64(&self) -> Option<&str> {
        self.payload("audio_base64")
    }

    pub fn video_base64(&self) -> Option<&str> {
        self.payload("video_base64")
    }

    pub fn require_image(&self) -> Result<&str, ApiError> {
        self.image_base64()
            .ok_or_else(|| ApiError::InvalidRequest("缺少 image_base64 参数".to_string()))
    }

    pub fn require_video(&self) -> Result<&str, ApiError> {
        self.video_base64()
            .ok_or_else(|| ApiError::InvalidRequest("缺少 video_base64 参数".to_string()))
    }

    pub fn f32_or(&self, key: &str, default: f32) -> Result<f32, ApiError> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(|v| v as f32)
                .ok_or_else(|| invalid_number(key)),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid_number(key)),
            Some(_) => Err(invalid_number(key)),
        }
    }

    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize, ApiError> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|v| v as usize)
                .ok_or_else(|| invalid_number(key)),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid_number(key)),
            Some(_) => Err(invalid_number(key)),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ApiError> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_f64().map_or(false, |v| v != 0.0)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" | "" => Ok(false),
                _ => Err(ApiError::ValidationError {
                    field: key.to_string(),
                    message: "必须是布尔值".to_string(),
                }),
            },
            Some(_) => Err(ApiError::ValidationError {
                field: key.to_string(),
                message: "必须是布尔值".to_string(),
            }),
        }
    }

    /// Uniform request for a provider adapter
    pub fn to_provider_input(&self) -> ProviderInput {
        ProviderInput {
            image_base64: self.image_base64().map(str::to_string),
            audio_base64: self.audio_base64().map(str::to_string),
            language: self.str("language").map(str::to_string),
            search_type: self.str("search_type").map(str::to_string),
            brief: self.str("brief").map(str::to_string),
            cont_sign: self.str("cont_sign").map(str::to_string),
        }
    }
}

fn invalid_number(key: &str) -> ApiError {
    ApiError::ValidationError {
        field: key.to_string(),
        message: "必须是数字".to_string(),
    }
}

/// Interpret a multipart text part as bool, number or string
pub fn parse_scalar(text: &str) -> Value {
    let trimmed = text.trim();
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(text.to_string())
}

#[async_trait]
impl<S> FromRequest<S> for TaskInput
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("无效的表单数据: {}", e)))?;
            return read_multipart(multipart).await;
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("无法读取请求体: {}", e)))?;
        if body.is_empty() {
            return Ok(TaskInput::default());
        }
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::InvalidRequest(format!("无效的 JSON 请求体: {}", e)))?;
        match value {
            Value::Object(fields) => Ok(TaskInput { fields }),
            _ => Err(ApiError::InvalidRequest("请求体必须是 JSON 对象".to_string())),
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<TaskInput, ApiError> {
    let mut fields = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("无效的表单数据: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }

        if FILE_FIELDS.contains(&name.as_str()) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("读取上传文件失败: {}", e)))?;
            debug!("multipart file part '{}' ({} bytes)", name, bytes.len());
            fields.insert(format!("{}_base64", name), Value::String(STANDARD.encode(&bytes)));
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("读取表单字段失败: {}", e)))?;
            fields.insert(name, parse_scalar(&text));
        }
    }
    Ok(TaskInput { fields })
}
