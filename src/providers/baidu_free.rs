// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Baidu free tier: education OCR, speech recognition and image search
//!
//! Each capability uses its own application credentials and token cache.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::baidu::{auth::BaiduAuth, log_id};
use super::{
    parse_response, send_json, ProviderError, ProviderInput, ProviderOutput, ProviderTask,
    VisionProvider,
};
use crate::config::AppCredentials;

pub const SPEECH_URL: &str = "https://vop.baidu.com/server_api";

const FORMULA_PATH: &str = "/rest/2.0/ocr/v1/formula";
const DOC_ANALYSIS_PATH: &str = "/rest/2.0/ocr/v1/doc_analysis";
const ACCURATE_OCR_PATH: &str = "/rest/2.0/ocr/v1/accurate_basic";
const GENERAL_OCR_PATH: &str = "/rest/2.0/ocr/v1/general_basic";

const DEFAULT_BRIEF: &str = "无描述";

const SUPPORTED: &[ProviderTask] = &[
    ProviderTask::Formula,
    ProviderTask::DictPen,
    ProviderTask::Homework,
    ProviderTask::QuestionSegment,
    ProviderTask::Speech,
    ProviderTask::ImageSearch,
    ProviderTask::ImageAdd,
    ProviderTask::ImageDelete,
];

/// Speech model id for a `language` value
pub fn dev_pid(language: Option<&str>) -> u32 {
    match language.unwrap_or_default() {
        "english" => 1737,
        "cantonese" => 1637,
        _ => 1537,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOp {
    Search,
    Add,
    Delete,
}

impl SearchOp {
    fn as_str(&self) -> &'static str {
        match self {
            SearchOp::Search => "search",
            SearchOp::Add => "add",
            SearchOp::Delete => "delete",
        }
    }
}

/// API path for an image-search library; unknown types use `same`
pub fn search_path(search_type: Option<&str>, op: SearchOp) -> String {
    let library = match search_type.unwrap_or_default() {
        "similar" => Some("similar"),
        "product" => Some("product"),
        "picture" => Some("picturebook"),
        "fabric" => Some("fabric"),
        _ => None,
    };
    match library {
        Some(lib) => format!(
            "/rest/2.0/image-classify/v1/realtime_search/{}/{}",
            lib,
            op.as_str()
        ),
        None => format!("/rest/2.0/realtime_search/same_hq/{}", op.as_str()),
    }
}

fn question_start() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[1-9]").expect("valid question pattern"))
}

/// Group OCR lines into questions
///
/// A line that starts with a number or mentions `题` in its first five
/// characters opens a new question; other lines continue the current one.
pub fn segment_questions<'a, I>(lines: I) -> Vec<Question>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut questions = Vec::new();
    let mut current = String::new();
    let mut index = 0;

    for line in lines {
        let head: String = line.chars().take(5).collect();
        if question_start().is_match(line) || head.contains('题') {
            if !current.is_empty() {
                questions.push(Question::new(index, &current));
            }
            index += 1;
            current = line.to_string();
        } else {
            current.push(' ');
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        questions.push(Question::new(index, &current));
    }
    questions
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Location {
    fn zero() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub index: usize,
    pub content: String,
    pub location: Location,
}

impl Question {
    fn new(index: usize, content: &str) -> Self {
        Self {
            index,
            content: content.trim().to_string(),
            location: Location::zero(),
        }
    }
}

/// Baidu free-tier adapter
pub struct BaiduFreeProvider {
    ocr: BaiduAuth,
    nlp: BaiduAuth,
    image_search: BaiduAuth,
    speech_url: String,
}

impl BaiduFreeProvider {
    pub fn new(
        ocr: AppCredentials,
        nlp: AppCredentials,
        image_search: AppCredentials,
        timeout: Duration,
    ) -> Self {
        Self {
            ocr: BaiduAuth::new("baidu_free", ocr, timeout),
            nlp: BaiduAuth::new("baidu_free", nlp, timeout),
            image_search: BaiduAuth::new("baidu_free", image_search, timeout),
            speech_url: SPEECH_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.ocr = self.ocr.with_base_url(base_url);
        self.nlp = self.nlp.with_base_url(base_url);
        self.image_search = self.image_search.with_base_url(base_url);
        self
    }

    pub fn with_speech_url(mut self, url: &str) -> Self {
        self.speech_url = url.to_string();
        self
    }

    pub fn ocr_configured(&self) -> bool {
        self.ocr.is_configured()
    }

    pub fn nlp_configured(&self) -> bool {
        self.nlp.is_configured()
    }

    pub fn image_search_configured(&self) -> bool {
        self.image_search.is_configured()
    }

    fn auth_for(&self, task: ProviderTask) -> &BaiduAuth {
        match task {
            ProviderTask::Speech => &self.nlp,
            ProviderTask::ImageSearch | ProviderTask::ImageAdd | ProviderTask::ImageDelete => {
                &self.image_search
            }
            _ => &self.ocr,
        }
    }

    fn ensure_configured(&self, task: ProviderTask) -> Result<(), ProviderError> {
        if self.auth_for(task).is_configured() {
            info!("[BaiduFree] {} request", task);
            Ok(())
        } else {
            Err(ProviderError::NotConfigured {
                provider: self.name().to_string(),
            })
        }
    }

    async fn formula(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let result = self.ocr.post_form(FORMULA_PATH, &[("image", image)]).await?;
        let parsed: FormulaResponse = parse_response(self.name(), result.clone())?;

        let formulas: Vec<Value> = parsed
            .words_result
            .unwrap_or_default()
            .into_iter()
            .map(|f| {
                json!({
                    "words": f.words,
                    "confidence": f.probability.unwrap_or_default().average,
                })
            })
            .collect();

        Ok(ProviderOutput::new(
            "formula_recognition",
            format!("公式识别完成，识别到 {} 个公式", formulas.len()),
            json!({"formulas": formulas, "count": formulas.len(), "log_id": log_id(&result)}),
        ))
    }

    async fn dict_pen(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let result = self
            .ocr
            .post_form(DOC_ANALYSIS_PATH, &[("image", image)])
            .await?;
        let parsed: DocAnalysisResponse = parse_response(self.name(), result.clone())?;

        let words: Vec<Value> = parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                let rect = item.rect.unwrap_or_default();
                json!({
                    "words": item.words.text(),
                    "location": Location {
                        left: rect.left,
                        top: rect.top,
                        width: rect.width,
                        height: rect.height,
                    },
                })
            })
            .collect();

        Ok(ProviderOutput::new(
            "dict_pen_ocr",
            format!("文字识别完成，识别到 {} 行文字", words.len()),
            json!({
                "words_result": words,
                "words_result_num": words.len(),
                "log_id": log_id(&result),
            }),
        ))
    }

    async fn homework(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let result = self
            .ocr
            .post_form(ACCURATE_OCR_PATH, &[("image", image)])
            .await?;
        let lines = ocr_lines(self.name(), &result)?;

        let questions: Vec<Value> = lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                json!({
                    "question_id": (i + 1).to_string(),
                    "question_type": "text",
                    "question_content": text,
                    "student_answer": "",
                    "correct_answer": "",
                    "is_correct": null,
                    "score": 0,
                    "feedback": "已识别文字内容",
                })
            })
            .collect();

        Ok(ProviderOutput::new(
            "homework_correction",
            format!("作业识别完成，识别到 {} 行内容", questions.len()),
            json!({
                "status": "completed",
                "questions": questions,
                "total_score": 0,
                "max_score": 100,
                "log_id": log_id(&result),
            }),
        ))
    }

    async fn question_segment(&self, image: &str) -> Result<ProviderOutput, ProviderError> {
        let result = self
            .ocr
            .post_form(GENERAL_OCR_PATH, &[("image", image)])
            .await?;
        let lines = ocr_lines(self.name(), &result)?;
        let questions = segment_questions(lines.iter().map(String::as_str));

        Ok(ProviderOutput::new(
            "question_segment",
            format!("题目切分完成，识别到 {} 道题目", questions.len()),
            json!({"questions": questions, "count": questions.len(), "log_id": log_id(&result)}),
        ))
    }

    async fn speech(
        &self,
        audio: &str,
        audio_len: usize,
        language: Option<&str>,
    ) -> Result<ProviderOutput, ProviderError> {
        let token = self.nlp.access_token().await?;

        let body = json!({
            "format": "wav",
            "rate": 16000,
            "channel": 1,
            "cuid": Uuid::new_v4().to_string(),
            "token": token,
            "dev_pid": dev_pid(language),
            "speech": audio,
            "len": audio_len,
        });
        let request = self.nlp.client().post(&self.speech_url).json(&body);
        let result = send_json(self.name(), self.nlp.timeout(), request).await?;
        let parsed: SpeechResponse = parse_response(self.name(), result)?;

        if parsed.err_no != 0 {
            return Err(ProviderError::Vendor {
                provider: self.name().to_string(),
                code: parsed.err_no.to_string(),
                message: parsed.err_msg,
            });
        }

        Ok(ProviderOutput::new(
            "speech_recognition",
            "语音识别完成",
            json!({
                "result": parsed.result.unwrap_or_default().concat(),
                "corpus_no": parsed.corpus_no,
                "sn": parsed.sn,
            }),
        ))
    }

    async fn image_search(
        &self,
        image: &str,
        search_type: Option<&str>,
    ) -> Result<ProviderOutput, ProviderError> {
        let path = search_path(search_type, SearchOp::Search);
        let result = self.image_search.post_form(&path, &[("image", image)]).await?;
        let parsed: SearchResponse = parse_response(self.name(), result.clone())?;
        let hits = parsed.result.unwrap_or_default();

        Ok(ProviderOutput::new(
            "image_search",
            format!("图像搜索完成，找到 {} 个结果", hits.len()),
            json!({"result": hits, "result_num": hits.len(), "log_id": log_id(&result)}),
        ))
    }

    async fn image_add(
        &self,
        image: &str,
        input: &ProviderInput,
    ) -> Result<ProviderOutput, ProviderError> {
        let brief = input
            .brief
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BRIEF);
        let path = search_path(input.search_type.as_deref(), SearchOp::Add);
        let result = self
            .image_search
            .post_form(&path, &[("image", image), ("brief", brief)])
            .await?;

        Ok(ProviderOutput::new(
            "image_add",
            "图片已添加到图库",
            json!({
                "cont_sign": result.get("cont_sign").cloned().unwrap_or(json!("")),
                "log_id": log_id(&result),
            }),
        ))
    }

    async fn image_delete(
        &self,
        cont_sign: &str,
        search_type: Option<&str>,
    ) -> Result<ProviderOutput, ProviderError> {
        let path = search_path(search_type, SearchOp::Delete);
        let result = self
            .image_search
            .post_form(&path, &[("cont_sign", cont_sign)])
            .await?;

        Ok(ProviderOutput::new(
            "image_delete",
            "图片已从图库删除",
            json!({"log_id": log_id(&result)}),
        ))
    }
}

fn ocr_lines(provider: &str, result: &Value) -> Result<Vec<String>, ProviderError> {
    let parsed: OcrResponse = parse_response(provider, result.clone())?;
    Ok(parsed
        .words_result
        .unwrap_or_default()
        .into_iter()
        .map(|w| w.words)
        .collect())
}

#[async_trait]
impl VisionProvider for BaiduFreeProvider {
    fn name(&self) -> &'static str {
        "baidu_free"
    }

    /// Any of the three credential sets is enough
    fn is_configured(&self) -> bool {
        self.ocr_configured() || self.nlp_configured() || self.image_search_configured()
    }

    fn supported_tasks(&self) -> &'static [ProviderTask] {
        SUPPORTED
    }

    fn task_id(&self, task: ProviderTask) -> String {
        let id = match task {
            ProviderTask::Formula => "formula_recognition",
            ProviderTask::DictPen => "dict_pen_ocr",
            ProviderTask::Homework => "homework_correction",
            ProviderTask::Speech => "speech_recognition",
            other => other.as_str(),
        };
        id.to_string()
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

        // Payload problems are reported before missing credentials
        match task {
            ProviderTask::Speech => {
                let (audio, audio_len) = input.require_audio()?;
                self.ensure_configured(task)?;
                self.speech(&audio, audio_len, input.language.as_deref()).await
            }
            ProviderTask::ImageDelete => {
                let cont_sign = input
                    .cont_sign
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| ProviderError::InvalidInput("缺少 cont_sign 参数".to_string()))?;
                self.ensure_configured(task)?;
                self.image_delete(cont_sign, input.search_type.as_deref()).await
            }
            _ => {
                let image = input.require_image()?;
                self.ensure_configured(task)?;
                match task {
                    ProviderTask::Formula => self.formula(&image).await,
                    ProviderTask::DictPen => self.dict_pen(&image).await,
                    ProviderTask::Homework => self.homework(&image).await,
                    ProviderTask::QuestionSegment => self.question_segment(&image).await,
                    ProviderTask::ImageSearch => {
                        self.image_search(&image, input.search_type.as_deref()).await
                    }
                    _ => self.image_add(&image, input).await,
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    words_result: Option<Vec<super::baidu::WordsLine>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Probability {
    average: f64,
}

#[derive(Debug, Deserialize)]
struct FormulaLine {
    #[serde(default)]
    words: String,
    #[serde(default)]
    probability: Option<Probability>,
}

#[derive(Debug, Deserialize)]
struct FormulaResponse {
    #[serde(default)]
    words_result: Option<Vec<FormulaLine>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Rect {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

/// `words` is either `{"word": ..}` or a bare value
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DocWords {
    Object {
        #[serde(default)]
        word: String,
    },
    Text(String),
    Other(Value),
}

impl Default for DocWords {
    fn default() -> Self {
        DocWords::Other(Value::Null)
    }
}

impl DocWords {
    fn text(&self) -> String {
        match self {
            DocWords::Object { word } => word.clone(),
            DocWords::Text(text) => text.clone(),
            DocWords::Other(Value::Null) => String::new(),
            DocWords::Other(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DocItem {
    #[serde(default)]
    words: DocWords,
    #[serde(default)]
    rect: Option<Rect>,
}

#[derive(Debug, Deserialize)]
struct DocAnalysisResponse {
    #[serde(default)]
    results: Option<Vec<DocItem>>,
}

#[derive(Debug, Deserialize)]
struct SpeechResponse {
    #[serde(default)]
    err_no: i64,
    #[serde(default)]
    err_msg: String,
    #[serde(default)]
    result: Option<Vec<String>>,
    #[serde(default)]
    corpus_no: Value,
    #[serde(default)]
    sn: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct SearchHit {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    brief: String,
    #[serde(default)]
    cont_sign: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Option<Vec<SearchHit>>,
}
