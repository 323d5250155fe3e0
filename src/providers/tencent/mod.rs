// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tencent Cloud image analysis (TIIA) adapter
//!
//! Calls the API 3.0 endpoint directly with TC3-HMAC-SHA256 signing.

pub mod signer;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use super::{
    build_client, parse_response, send_json, ProviderError, ProviderInput, ProviderOutput,
    ProviderTask, VisionProvider,
};
use crate::config::TencentCredentials;
use signer::{Tc3Signer, CONTENT_TYPE};

pub const TIIA_SERVICE: &str = "tiia";
pub const TIIA_VERSION: &str = "2019-05-29";
pub const TIIA_HOST: &str = "tiia.tencentcloudapi.com";
pub const SOURCE: &str = "tencent_cloud";

const UNKNOWN: &str = "未知";

const SUPPORTED: &[ProviderTask] = &[ProviderTask::Detect, ProviderTask::Label, ProviderTask::Car];

/// Tencent Cloud TIIA provider
pub struct TencentProvider {
    credentials: TencentCredentials,
    endpoint: String,
    host: String,
    client: Client,
    timeout: Duration,
}

impl TencentProvider {
    pub fn new(credentials: TencentCredentials, timeout: Duration) -> Self {
        Self {
            credentials,
            endpoint: format!("https://{}", TIIA_HOST),
            host: TIIA_HOST.to_string(),
            client: build_client(timeout),
            timeout,
        }
    }

    /// Point the adapter at a different base URL
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        self.host = url::Url::parse(&endpoint)
            .ok()
            .and_then(|u| {
                u.host_str().map(|h| match u.port() {
                    Some(port) => format!("{}:{}", h, port),
                    None => h.to_string(),
                })
            })
            .unwrap_or_else(|| TIIA_HOST.to_string());
        self.endpoint = endpoint;
        self
    }

    pub fn region(&self) -> &str {
        self.credentials.region()
    }

    /// Signed call to `action`; returns the inner `Response` object
    async fn call(&self, action: &str, payload: Value) -> Result<Value, ProviderError> {
        let body = payload.to_string();
        let timestamp = chrono::Utc::now().timestamp();
        let signer = Tc3Signer::new(
            &self.credentials.secret_id,
            &self.credentials.secret_key,
            TIIA_SERVICE,
        );
        let authorization = signer.authorization(&self.host, &body, timestamp);

        let request = self
            .client
            .post(&self.endpoint)
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE)
            .header("Host", &self.host)
            .header("X-TC-Action", action)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Version", TIIA_VERSION)
            .header("X-TC-Region", self.region())
            .body(body);

        let value = send_json(self.name(), self.timeout, request).await?;
        let envelope: TencentEnvelope = parse_response(self.name(), value)?;

        if let Some(error) = envelope.response.get("Error") {
            let error: TencentError = parse_response(self.name(), error.clone())?;
            return Err(ProviderError::Vendor {
                provider: self.name().to_string(),
                code: error.code,
                message: error.message,
            });
        }
        Ok(envelope.response)
    }

    async fn detect_label(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let response = self
            .call("DetectLabel", json!({"ImageBase64": image, "Scenes": ["CAMERA"]}))
            .await?;
        let parsed: LabelsResponse = parse_response(self.name(), response)?;

        let labels: Vec<DetectLabel> = parsed
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| DetectLabel {
                name: l.name,
                name_en: l.first_category,
                confidence: l.confidence / 100.0,
                category: l.second_category,
            })
            .collect();

        Ok(ProviderOutput::new(
            "tencent_detect",
            format!("腾讯云检测完成，识别到 {} 个标签", labels.len()),
            json!({"labels": labels, "count": labels.len(), "source": SOURCE}),
        ))
    }

    async fn detect_label_pro(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let response = self.call("DetectLabelPro", json!({"ImageBase64": image})).await?;
        let parsed: LabelsResponse = parse_response(self.name(), response)?;

        let labels: Vec<ProLabel> = parsed
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| ProLabel {
                name: l.name,
                confidence: l.confidence / 100.0,
                first_category: l.first_category,
                second_category: l.second_category,
            })
            .collect();

        Ok(ProviderOutput::new(
            "tencent_label",
            format!("腾讯云标签识别完成，识别到 {} 个标签", labels.len()),
            json!({"labels": labels, "count": labels.len(), "source": SOURCE}),
        ))
    }

    async fn recognize_car(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let response = self.call("RecognizeCar", json!({"ImageBase64": image})).await?;
        info!("[Tencent] RecognizeCar response received");
        let parsed: CarResponse = parse_response(self.name(), response)?;

        let tags = parsed.car_tags.unwrap_or_default();
        let cars: Vec<Car> = parsed
            .car_coords
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, coord)| {
                let coord = coord.unwrap_or_default();
                let tag = tags.get(i).cloned().flatten().unwrap_or_default();
                Car {
                    brand: or_unknown(tag.brand),
                    model: or_unknown(tag.kind),
                    color: or_unknown(tag.color),
                    year: tag.year.unwrap_or_else(|| Value::String(UNKNOWN.to_string())),
                    confidence: tag.confidence.unwrap_or(0.0) / 100.0,
                    bbox: BBox {
                        x1: coord.x,
                        y1: coord.y,
                        x2: coord.x + coord.width,
                        y2: coord.y + coord.height,
                    },
                }
            })
            .collect();

        Ok(ProviderOutput::new(
            "tencent_car",
            format!("腾讯云车辆识别完成，识别到 {} 辆车", cars.len()),
            json!({"cars": cars, "count": cars.len(), "source": SOURCE}),
        ))
    }
}

fn or_unknown(value: Option<String>) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[async_trait]
impl VisionProvider for TencentProvider {
    fn name(&self) -> &'static str {
        "tencent"
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_configured()
    }

    fn supported_tasks(&self) -> &'static [ProviderTask] {
        SUPPORTED
    }

    async fn analyze(
        &self,
        task: ProviderTask,
        input: &ProviderInput,
    ) -> Result<ProviderOutput, ProviderError> {
        if !self.supports(task) {
            return Err(ProviderError::UnsupportedTask {
                provider: self.name().to_string(),
                task: task.to_string(),
            });
        }
        let image = input.require_image()?;
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured {
                provider: self.name().to_string(),
            });
        }

        info!("[Tencent] {} request, region {}", task, self.region());
        match task {
            ProviderTask::Detect => self.detect_label(&image).await,
            ProviderTask::Label => self.detect_label_pro(&image).await,
            _ => self.recognize_car(&image).await,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TencentEnvelope {
    #[serde(rename = "Response")]
    response: Value,
}

#[derive(Debug, Deserialize)]
struct TencentError {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LabelsResponse {
    #[serde(default)]
    labels: Option<Vec<TencentLabel>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TencentLabel {
    #[serde(default)]
    name: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    first_category: String,
    #[serde(default)]
    second_category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CarResponse {
    #[serde(default)]
    car_coords: Option<Vec<Option<CarCoord>>>,
    #[serde(default)]
    car_tags: Option<Vec<Option<CarTag>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CarCoord {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CarTag {
    brand: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
    color: Option<String>,
    year: Option<Value>,
    confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
struct DetectLabel {
    name: String,
    name_en: String,
    confidence: f64,
    category: String,
}

#[derive(Debug, Serialize)]
struct ProLabel {
    name: String,
    confidence: f64,
    first_category: String,
    second_category: String,
}

#[derive(Debug, Serialize)]
struct BBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

#[derive(Debug, Serialize)]
struct Car {
    brand: String,
    model: String,
    color: String,
    year: Value,
    confidence: f64,
    bbox: BBox,
}
