// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Job response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a successful job: the upstream JSON wrapped unchanged
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSuccessResponse {
    /// Always "success"
    pub status: String,
    /// Upstream response body
    pub result: Value,
}

impl JobSuccessResponse {
    pub fn new(result: Value) -> Self {
        Self {
            status: "success".to_string(),
            result,
        }
    }
}
