// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vision_gateway::{
    api::{start_server, AppState},
    cli::Cli,
    config::KeysConfig,
    version,
    vision::YoloTask,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🚀 Starting {}...\n", version::SERVICE_NAME);
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();

    let config = Cli::parse().into_config();
    let keys = KeysConfig::load_or_default(&config.keys_file);

    let state = AppState::new(config, keys);

    for task in YoloTask::ALL {
        if state.models.is_available(task) {
            info!("✅ {} model found", task.as_str());
        } else {
            warn!(
                "⚠️ {} model missing: {}",
                task.as_str(),
                state.models.model_path(task).display()
            );
        }
    }
    if !state.models.has_plate_recognizer() {
        warn!("⚠️ License plate models missing, /api/lpr will return 503");
    }
    info!("{}", version::get_version_string());
    info!("Registered providers: {:?}", state.providers.names());

    start_server(state).await
}
