// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use super::{baidu, baidu_free, lpr, status, tencent, yolo};
use crate::config::{KeysConfig, ServerConfig};
use crate::providers::{
    BaiduFreeProvider, BaiduProvider, ProviderRegistry, TencentProvider, VisionProvider,
};
use crate::vision::{Annotator, VisionModelConfig, VisionModelManager};

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub keys: Arc<KeysConfig>,
    pub models: Arc<VisionModelManager>,
    pub annotator: Arc<Annotator>,
    pub providers: ProviderRegistry,
}

impl AppState {
    pub fn new(config: ServerConfig, keys: KeysConfig) -> Self {
        let timeout = config.vendor_timeout;

        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(TencentProvider::new(keys.tencent.clone(), timeout)));
        providers.register(Arc::new(BaiduProvider::new(
            keys.baidu.clone(),
            keys.face_credentials().clone(),
            timeout,
        )));
        providers.register(Arc::new(BaiduFreeProvider::new(
            keys.baidu_ocr.clone(),
            keys.baidu_nlp.clone(),
            keys.baidu_image_search.clone(),
            timeout,
        )));

        let models = VisionModelManager::new(VisionModelConfig {
            models_dir: config.models_dir.clone(),
        });
        let annotator = Annotator::from_font_path(config.font_path.as_deref());

        Self {
            config: Arc::new(config),
            keys: Arc::new(keys),
            models: Arc::new(models),
            annotator: Arc::new(annotator),
            providers,
        }
    }

    /// No models on disk and no vendor credentials
    pub fn new_for_test() -> Self {
        let config = ServerConfig {
            models_dir: PathBuf::from("./target/no-such-models"),
            ..ServerConfig::default()
        };
        Self::new(config, KeysConfig::default())
    }

    /// Replace (or add) the adapter registered under the same name
    pub fn with_provider(mut self, provider: Arc<dyn VisionProvider>) -> Self {
        self.providers.register(provider);
        self
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn VisionProvider>> {
        self.providers.get(name)
    }
}

pub fn create_app(state: AppState) -> Router {
    let max_body = state.config.max_body_bytes;

    Router::new()
        .route("/", get(status::root_handler))
        .route("/health", get(status::health_handler))
        .route("/api/status", get(status::api_status_handler))
        // Local models
        .route("/api/detect", post(yolo::detect_handler))
        .route("/api/classify", post(yolo::classify_handler))
        .route("/api/pose", post(yolo::pose_handler))
        .route("/api/segment", post(yolo::segment_handler))
        .route("/api/video/pose", post(yolo::video_pose_handler))
        .route("/api/lpr", post(lpr::lpr_handler))
        .route("/api/lpr/status", get(lpr::lpr_status_handler))
        // Tencent
        .route("/api/tencent/detect", post(tencent::tencent_detect_handler))
        .route("/api/tencent/label", post(tencent::tencent_label_handler))
        .route("/api/tencent/car", post(tencent::tencent_car_handler))
        .route("/api/tencent/status", get(tencent::tencent_status_handler))
        // Baidu
        .route("/api/baidu/image", post(baidu::baidu_image_handler))
        .route("/api/baidu/detect", post(baidu::baidu_image_handler))
        .route("/api/baidu/ocr", post(baidu::baidu_ocr_handler))
        .route("/api/baidu/status", get(baidu::baidu_status_handler))
        // Baidu free tier
        .route("/api/baidu-free/ocr", post(baidu_free::free_ocr_handler))
        .route("/api/baidu-free/formula", post(baidu_free::formula_handler))
        .route("/api/baidu-free/dict-ocr", post(baidu_free::dict_ocr_handler))
        .route("/api/baidu-free/homework", post(baidu_free::homework_handler))
        .route(
            "/api/baidu-free/question-split",
            post(baidu_free::question_split_handler),
        )
        .route("/api/baidu-free/speech", post(baidu_free::speech_handler))
        .route(
            "/api/baidu-free/image-search",
            post(baidu_free::image_search_handler),
        )
        .route(
            "/api/baidu-free/image-search/add",
            post(baidu_free::image_add_handler),
        )
        .route(
            "/api/baidu-free/image-search/delete",
            post(baidu_free::image_delete_handler),
        )
        .route("/api/baidu-free/status", get(baidu_free::free_status_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.socket_addr()?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Vision gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
