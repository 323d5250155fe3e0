// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod keys;
pub mod server;

pub use keys::{AppCredentials, KeysConfig, KeysError, TencentCredentials, DEFAULT_TENCENT_REGION};
pub use server::ServerConfig;
