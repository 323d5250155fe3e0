// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod baidu;
pub mod baidu_free;
pub mod envelope;
pub mod errors;
pub mod http_server;
pub mod input;
pub mod lpr;
pub mod status;
pub mod tencent;
pub mod yolo;

pub use envelope::Envelope;
pub use errors::{ApiError, TaskFailure};
pub use http_server::{create_app, start_server, AppState};
pub use input::TaskInput;

use axum::Json;
use tracing::{error, info};

use crate::providers::ProviderTask;

/// Run CPU-bound inference off the async runtime
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("Inference task panicked: {}", e);
        ApiError::InternalError(format!("推理任务异常终止: {}", e))
    })?
}

/// Hand one request to a registered vendor adapter
pub(crate) async fn dispatch(
    state: &AppState,
    provider_name: &str,
    task: ProviderTask,
    input: &TaskInput,
) -> Result<Json<Envelope>, TaskFailure> {
    let Some(provider) = state.provider(provider_name) else {
        return Err(ApiError::ServiceUnavailable(format!("{} 未启用", provider_name))
            .for_task(format!("{}_{}", provider_name, task)));
    };

    let task_id = provider.task_id(task);
    info!("[{}] {}", provider_name, task_id);
    provider
        .analyze(task, &input.to_provider_input())
        .await
        .map(|output| Json(Envelope::from(output)))
        .map_err(|e| ApiError::from(e).for_task(task_id))
}

/// `api_type` from the request, or `default` when absent
pub(crate) fn api_type(
    input: &TaskInput,
    provider_name: &str,
    default: ProviderTask,
) -> Result<ProviderTask, TaskFailure> {
    match input.str("api_type") {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| ApiError::from(e).for_task(format!("{}_{}", provider_name, raw))),
    }
}
