// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Uniform `{success, task, message, data}` response wrapper

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::providers::ProviderOutput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub task: String,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    pub fn ok(task: impl Into<String>, message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            task: task.into(),
            message: message.into(),
            data,
        }
    }

    /// Failed request; `data` is always null
    pub fn failure(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            task: task.into(),
            message: message.into(),
            data: Value::Null,
        }
    }
}

impl From<ProviderOutput> for Envelope {
    fn from(output: ProviderOutput) -> Self {
        Envelope::ok(output.task, output.message, output.data)
    }
}
