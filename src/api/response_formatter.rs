// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Maps relay outcomes and pipeline errors to the outward status/body contract
//!
//! | Outcome          | Status | Body                                  |
//! |------------------|--------|---------------------------------------|
//! | Success          | 200    | `{"status": "success", "result": ..}` |
//! | UpstreamError    | 502    | upstream body, relayed verbatim       |
//! | TransportFailure | 500    | `{error, details}`                    |
//! | Timeout          | 504    | `{"error": "request timed out"}`      |
//! | TooLarge         | 413    | `{error}`                             |
//! | other errors     | 500    | `{error, details}`                    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{error, warn};

use super::errors::{ApiError, ErrorResponse};
use super::jobs::JobSuccessResponse;
use crate::relay::{RelayError, RelayOutcome};

pub const TIMEOUT_MESSAGE: &str = "request timed out";

/// Outward status and JSON body for one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl JobResponse {
    fn json<T: serde::Serialize>(status: StatusCode, body: &T) -> Self {
        let body = serde_json::to_value(body).unwrap_or(Value::Null);
        Self { status, body }
    }
}

impl IntoResponse for JobResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Translate a classified upstream outcome
pub fn translate_outcome(outcome: RelayOutcome) -> JobResponse {
    match outcome {
        RelayOutcome::Success(result) => {
            JobResponse::json(StatusCode::OK, &JobSuccessResponse::new(result))
        }
        RelayOutcome::UpstreamError { status, body } => {
            warn!("Relaying upstream error {} as 502", status);
            JobResponse {
                status: StatusCode::BAD_GATEWAY,
                body,
            }
        }
        RelayOutcome::TransportFailure(kind) => {
            error!("Upstream transport failure: {}", kind);
            JobResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse::with_details("upstream request failed", kind.to_string()),
            )
        }
        RelayOutcome::Timeout => {
            warn!("Upstream request timed out");
            JobResponse::json(StatusCode::GATEWAY_TIMEOUT, &ErrorResponse::new(TIMEOUT_MESSAGE))
        }
    }
}

/// Translate a failure that stopped the job before the upstream classified it
pub fn translate_error(err: RelayError) -> JobResponse {
    let err = ApiError(err);
    err.log();
    JobResponse::json(err.status_code(), &err.to_response())
}

/// Translate the full pipeline result
pub fn translate(result: Result<RelayOutcome, RelayError>) -> JobResponse {
    match result {
        Ok(outcome) => translate_outcome(outcome),
        Err(err) => translate_error(err),
    }
}
