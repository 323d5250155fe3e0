// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Baidu AI open platform, paid image APIs

pub mod auth;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use super::{parse_response, ProviderError, ProviderInput, ProviderOutput, ProviderTask, VisionProvider};
use crate::config::AppCredentials;
pub use auth::{check_error, log_id, BaiduAuth, BAIDU_BASE_URL};

pub const SOURCE: &str = "baidu_ai";

/// Returned by face detect when the image holds no face
const NO_FACE_ERROR: &str = "222202";

const FACE_FIELDS: &str = "age,beauty,expression,face_shape,gender,glasses,landmark,landmark150,quality,eye_status,emotion,face_type,mask,spoofing";
const MAX_FACES: u32 = 10;

const CLASSIFY_PATH: &str = "/rest/2.0/image-classify/v2/advanced_general";
const OBJECT_DETECT_PATH: &str = "/rest/2.0/image-classify/v1/object_detect";
const CAR_PATH: &str = "/rest/2.0/image-classify/v1/car";
const FACE_DETECT_PATH: &str = "/rest/2.0/face/v3/detect";
const GENERAL_OCR_PATH: &str = "/rest/2.0/ocr/v1/general_basic";

const SUPPORTED: &[ProviderTask] = &[
    ProviderTask::Classify,
    ProviderTask::Detect,
    ProviderTask::Face,
    ProviderTask::Car,
    ProviderTask::Ocr,
];

/// Baidu paid tier: image classify, subject detect, face, car and general OCR
pub struct BaiduProvider {
    image: BaiduAuth,
    face: BaiduAuth,
}

impl BaiduProvider {
    /// `face` is the credential set used for face analysis
    pub fn new(image: AppCredentials, face: AppCredentials, timeout: Duration) -> Self {
        Self {
            image: BaiduAuth::new("baidu", image, timeout),
            face: BaiduAuth::new("baidu", face, timeout),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.image = self.image.with_base_url(base_url);
        self.face = self.face.with_base_url(base_url);
        self
    }

    async fn classify(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let result = self
            .image
            .post_form(CLASSIFY_PATH, &[("image", image), ("baike_num", "1")])
            .await?;
        let parsed: ListResponse<ClassifyItem> = parse_response(self.name(), result.clone())?;

        let items: Vec<Value> = parsed
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                let baike = item.baike_info.unwrap_or_default();
                json!({
                    "name": item.keyword,
                    "confidence": item.score,
                    "root": item.root,
                    "baike_url": baike.baike_url,
                    "description": baike.description,
                })
            })
            .collect();

        Ok(ProviderOutput::new(
            "baidu_classify",
            format!("百度 AI 图像分类完成，识别到 {} 个结果", items.len()),
            json!({
                "items": items,
                "count": items.len(),
                "log_id": log_id(&result),
                "source": SOURCE,
            }),
        ))
    }

    async fn detect(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let result = self
            .image
            .post_form(OBJECT_DETECT_PATH, &[("image", image)])
            .await?;

        let mut objects = Vec::new();
        if let Some(subject) = result.get("result").filter(|r| r.get("left").is_some()) {
            let region: Region = parse_response(self.name(), subject.clone())?;
            objects.push(json!({
                "name": "主体",
                "confidence": 1.0,
                "bbox": region.bbox(),
            }));
        }

        Ok(ProviderOutput::new(
            "baidu_detect",
            format!("百度 AI 物体检测完成，检测到 {} 个目标", objects.len()),
            json!({
                "objects": objects,
                "count": objects.len(),
                "log_id": log_id(&result),
                "source": SOURCE,
            }),
        ))
    }

    async fn face(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let body = json!({
            "image": image,
            "image_type": "BASE64",
            "face_field": FACE_FIELDS,
            "max_face_num": MAX_FACES,
            "face_type": "LIVE",
            "liveness_control": "NONE",
        });

        let result = match self.face.post_json(FACE_DETECT_PATH, &body).await {
            Ok(result) => result,
            Err(ProviderError::Vendor { code, .. }) if code == NO_FACE_ERROR => {
                return Ok(ProviderOutput::new(
                    "baidu_face",
                    "未检测到人脸",
                    json!({"faces": [], "count": 0, "source": SOURCE}),
                ));
            }
            Err(e) => return Err(e),
        };

        let parsed: FaceResponse = parse_response(self.name(), result.clone())?;
        let faces: Vec<Value> = parsed
            .result
            .and_then(|r| r.face_list)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, face)| face.to_json(i + 1))
            .collect();

        Ok(ProviderOutput::new(
            "baidu_face",
            format!("百度 AI 人脸识别完成，检测到 {} 张人脸", faces.len()),
            json!({
                "faces": faces,
                "count": faces.len(),
                "log_id": log_id(&result),
                "source": SOURCE,
            }),
        ))
    }

    async fn car(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let result = self
            .image
            .post_form(CAR_PATH, &[("image", image), ("baike_num", "1")])
            .await?;
        let parsed: ListResponse<CarItem> = parse_response(self.name(), result.clone())?;

        let cars: Vec<Value> = parsed
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|car| {
                json!({
                    "name": car.name,
                    "score": car.score,
                    "year": car.year,
                    "baike_url": car.baike_info.unwrap_or_default().baike_url,
                })
            })
            .collect();

        Ok(ProviderOutput::new(
            "baidu_car",
            format!("百度 AI 车型识别完成，识别到 {} 个结果", cars.len()),
            json!({
                "cars": cars,
                "count": cars.len(),
                "color_result": result.get("color_result").cloned().unwrap_or(json!("")),
                "log_id": log_id(&result),
                "source": SOURCE,
            }),
        ))
    }

    async fn ocr(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let result = self
            .image
            .post_form(GENERAL_OCR_PATH, &[("image", image)])
            .await?;
        let parsed: WordsResponse = parse_response(self.name(), result.clone())?;

        let words: Vec<Value> = parsed
            .words_result
            .unwrap_or_default()
            .into_iter()
            .map(|w| json!({"words": w.words}))
            .collect();

        Ok(ProviderOutput::new(
            "baidu_ocr",
            format!("百度 AI 文字识别完成，识别到 {} 行文字", words.len()),
            json!({
                "words_result": words,
                "words_result_num": words.len(),
                "log_id": log_id(&result),
                "source": SOURCE,
            }),
        ))
    }
}

#[async_trait]
impl VisionProvider for BaiduProvider {
    fn name(&self) -> &'static str {
        "baidu"
    }

    fn is_configured(&self) -> bool {
        self.image.is_configured()
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
        let configured = match task {
            ProviderTask::Face => self.face.is_configured(),
            _ => self.image.is_configured(),
        };
        if !configured {
            return Err(ProviderError::NotConfigured {
                provider: self.name().to_string(),
            });
        }

        info!("[BaiduAI] {} request", task);
        match task {
            ProviderTask::Classify => self.classify(&image).await,
            ProviderTask::Detect => self.detect(&image).await,
            ProviderTask::Face => self.face(&image).await,
            ProviderTask::Car => self.car(&image).await,
            _ => self.ocr(&image).await,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default)]
    result: Option<Vec<T>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BaikeInfo {
    baike_url: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct ClassifyItem {
    #[serde(default)]
    keyword: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    root: String,
    #[serde(default)]
    baike_info: Option<BaikeInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct CarItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    year: Value,
    #[serde(default)]
    baike_info: Option<BaikeInfo>,
}

#[derive(Debug, Deserialize)]
struct WordsResponse {
    #[serde(default)]
    words_result: Option<Vec<WordsLine>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WordsLine {
    #[serde(default)]
    pub words: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Region {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    rotation: f64,
}

impl Region {
    fn bbox(&self) -> BBox {
        BBox {
            x1: self.left,
            y1: self.top,
            x2: self.left + self.width,
            y2: self.top + self.height,
        }
    }
}

#[derive(Debug, Serialize)]
struct BBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

#[derive(Debug, Deserialize)]
struct FaceResponse {
    #[serde(default)]
    result: Option<FaceResult>,
}

#[derive(Debug, Deserialize)]
struct FaceResult {
    #[serde(default)]
    face_list: Option<Vec<Face>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TypedAttribute<T> {
    #[serde(rename = "type")]
    kind: T,
    probability: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Face {
    age: f64,
    beauty: f64,
    gender: TypedAttribute<String>,
    expression: TypedAttribute<String>,
    emotion: TypedAttribute<String>,
    glasses: TypedAttribute<String>,
    mask: TypedAttribute<i64>,
    face_shape: TypedAttribute<String>,
    face_probability: f64,
    location: Region,
}

impl Face {
    fn to_json(&self, face_id: usize) -> Value {
        let face_shape = if self.face_shape.kind.is_empty() {
            "未知"
        } else {
            self.face_shape.kind.as_str()
        };
        json!({
            "face_id": face_id,
            "age": self.age,
            "beauty": self.beauty,
            "gender": gender_name(&self.gender.kind),
            "gender_confidence": self.gender.probability,
            "expression": expression_name(&self.expression.kind),
            "expression_confidence": self.expression.probability,
            "emotion": emotion_name(&self.emotion.kind),
            "emotion_confidence": self.emotion.probability,
            "glasses": if matches!(self.glasses.kind.as_str(), "" | "none") { "无眼镜" } else { "戴眼镜" },
            "mask": if self.mask.kind == 1 { "戴口罩" } else { "无口罩" },
            "face_shape": face_shape,
            "face_probability": self.face_probability,
            "bbox": self.location.bbox(),
            "rotation_angle": self.location.rotation,
        })
    }
}

fn gender_name(kind: &str) -> &'static str {
    match kind {
        "male" => "男性",
        "female" => "女性",
        _ => "未知",
    }
}

fn expression_name(kind: &str) -> &'static str {
    match kind {
        "" | "none" => "无表情",
        "smile" => "微笑",
        "laugh" => "大笑",
        _ => "未知",
    }
}

fn emotion_name(kind: &str) -> &'static str {
    match kind {
        "angry" => "愤怒",
        "disgust" => "厌恶",
        "fear" => "恐惧",
        "happy" => "高兴",
        "sad" => "悲伤",
        "surprise" => "惊讶",
        "" | "neutral" => "平静",
        _ => "未知",
    }
}
