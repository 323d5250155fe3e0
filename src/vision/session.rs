// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared ONNX Runtime session handle (CPU only)

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayD};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::InferenceError;

/// A loaded ONNX model with a single image input
#[derive(Clone)]
pub struct OnnxSession {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for OnnxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSession")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OnnxSession {
    /// Load `model_path`; `label` names the model in logs and errors
    pub fn load(model_path: &Path, label: &str) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("{} model not found: {}", label, model_path.display());
        }

        info!("Loading {} model from {}", label, model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load {} model from {}",
                label,
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("{} model input: {:?}", label, input.input_type);
        }

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Run one batch and copy out the first `n` outputs as `f32` arrays
    pub fn run(&self, input: Array4<f32>, n: usize) -> Result<Vec<ArrayD<f32>>, InferenceError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Runtime("model session lock poisoned".to_string()))?;

        let input_value = Value::from_array(input)?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_value])?;

        if outputs.len() < n {
            return Err(InferenceError::UnexpectedOutput(format!(
                "expected {} outputs, model produced {}",
                n,
                outputs.len()
            )));
        }

        let mut arrays = Vec::with_capacity(n);
        for i in 0..n {
            let array = outputs[i].try_extract_array::<f32>()?;
            arrays.push(array.to_owned());
        }
        Ok(arrays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_model() {
        let err = OnnxSession::load(Path::new("/nonexistent/model.onnx"), "Plate").unwrap_err();
        assert!(err.to_string().contains("Plate model not found"));
    }
}
