// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::http_server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub message: String,
    /// Whether images are staged on the media host before relay
    pub staging: bool,
}

/// GET / - liveness message, no side effects
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "image relay is running".to_string(),
        staging: state.pipeline.staging_enabled(),
    })
}
