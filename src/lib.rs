// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod providers;
pub mod version;
pub mod vision;

pub use api::{create_app, start_server, AppState, Envelope};
pub use config::{KeysConfig, ServerConfig};
pub use providers::{ProviderRegistry, VisionProvider};
