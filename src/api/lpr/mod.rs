// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! License plate recognition endpoints

pub mod handler;

pub use handler::{lpr_handler, lpr_status_handler, LPR_TASK};
