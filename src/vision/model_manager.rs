// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for lazily loading and caching local models

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vision::lpr::PlateRecognizer;
use crate::vision::yolo::{YoloModel, YoloTask};
use crate::vision::InferenceError;

/// Configuration for loading vision models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// Directory holding the YOLO `.onnx` files and the `lpr/` sub-directory
    pub models_dir: PathBuf,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("./models"),
        }
    }
}

/// Availability of one local model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub task: String,
    pub file: String,
    /// Model file exists on disk
    pub available: bool,
    /// Model is already loaded in memory
    pub loaded: bool,
}

/// Manager for the YOLO task models and the plate recognizer
///
/// Models load on first use and stay cached for the process lifetime.
/// All models run on CPU.
pub struct VisionModelManager {
    config: VisionModelConfig,
    yolo_models: RwLock<HashMap<YoloTask, Arc<YoloModel>>>,
    plate_recognizer: RwLock<Option<Arc<PlateRecognizer>>>,
}

impl VisionModelManager {
    pub fn new(config: VisionModelConfig) -> Self {
        Self {
            config,
            yolo_models: RwLock::new(HashMap::new()),
            plate_recognizer: RwLock::new(None),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.config.models_dir
    }

    pub fn model_path(&self, task: YoloTask) -> PathBuf {
        self.config.models_dir.join(task.model_file())
    }

    /// Check if the model file for `task` is present
    pub fn is_available(&self, task: YoloTask) -> bool {
        self.model_path(task).exists()
    }

    pub fn has_plate_recognizer(&self) -> bool {
        PlateRecognizer::is_available(&self.config.models_dir)
    }

    /// Get the model for `task`, loading it on first use
    pub async fn get_yolo_model(&self, task: YoloTask) -> Result<Arc<YoloModel>, InferenceError> {
        if let Some(model) = self.yolo_models.read().await.get(&task) {
            return Ok(model.clone());
        }

        let mut models = self.yolo_models.write().await;
        // Another request may have loaded it while we waited
        if let Some(model) = models.get(&task) {
            return Ok(model.clone());
        }

        let path = self.model_path(task);
        if !path.exists() {
            return Err(InferenceError::ModelUnavailable(format!(
                "{} model not found at {}",
                task,
                path.display()
            )));
        }

        let model = tokio::task::spawn_blocking(move || YoloModel::load(task, &path))
            .await
            .map_err(|e| InferenceError::Runtime(format!("model loader panicked: {}", e)))?
            .map_err(|e| {
                tracing::warn!("⚠️ Failed to load YOLO {} model: {:#}", task, e);
                InferenceError::ModelUnavailable(format!("{:#}", e))
            })?;

        let model = Arc::new(model);
        models.insert(task, model.clone());
        Ok(model)
    }

    /// Get the plate recognizer, loading it on first use
    pub async fn get_plate_recognizer(&self) -> Result<Arc<PlateRecognizer>, InferenceError> {
        if let Some(recognizer) = self.plate_recognizer.read().await.as_ref() {
            return Ok(recognizer.clone());
        }

        let mut slot = self.plate_recognizer.write().await;
        if let Some(recognizer) = slot.as_ref() {
            return Ok(recognizer.clone());
        }

        if !self.has_plate_recognizer() {
            return Err(InferenceError::ModelUnavailable(format!(
                "license plate models not found under {}",
                self.config.models_dir.display()
            )));
        }

        let dir = self.config.models_dir.clone();
        let recognizer = tokio::task::spawn_blocking(move || PlateRecognizer::load(&dir))
            .await
            .map_err(|e| InferenceError::Runtime(format!("model loader panicked: {}", e)))?
            .map_err(|e| {
                tracing::warn!("⚠️ Failed to load plate recognizer: {:#}", e);
                InferenceError::ModelUnavailable(format!("{:#}", e))
            })?;

        let recognizer = Arc::new(recognizer);
        *slot = Some(recognizer.clone());
        Ok(recognizer)
    }

    pub async fn is_plate_recognizer_loaded(&self) -> bool {
        self.plate_recognizer.read().await.is_some()
    }

    /// List the YOLO task models and their state
    pub async fn list_models(&self) -> Vec<ModelStatus> {
        let loaded = self.yolo_models.read().await;
        YoloTask::ALL
            .iter()
            .map(|task| ModelStatus {
                task: task.as_str().to_string(),
                file: task.model_file().to_string(),
                available: self.is_available(*task),
                loaded: loaded.contains_key(task),
            })
            .collect()
    }
}
