// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::relay::{ConfigError, RelayError, StagingError, ValidationError};

/// JSON error envelope returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// A pipeline failure rendered as an HTTP response
#[derive(Debug, Clone)]
pub struct ApiError(pub RelayError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            RelayError::Validation(ValidationError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Validation(_) | RelayError::Config(_) | RelayError::Staging(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Caller-facing envelope; configuration problems stay terse
    pub fn to_response(&self) -> ErrorResponse {
        match &self.0 {
            RelayError::Validation(err @ ValidationError::TooLarge { .. }) => {
                ErrorResponse::new(err.to_string())
            }
            RelayError::Validation(err) => ErrorResponse::with_details("invalid request", err.to_string()),
            RelayError::Config(ConfigError::MissingCredential(_) | ConfigError::Invalid(_)) => {
                ErrorResponse::with_details("service misconfigured", "server configuration error")
            }
            RelayError::Staging(StagingError::ConfigMissing(_)) => {
                ErrorResponse::with_details("image staging failed", "media host is not configured")
            }
            RelayError::Staging(err) => ErrorResponse::with_details("image staging failed", err.to_string()),
        }
    }

    pub(crate) fn log(&self) {
        match &self.0 {
            RelayError::Validation(err) => warn!("Rejected job request: {}", err),
            RelayError::Config(err) => error!("Configuration error: {}", err),
            RelayError::Staging(err) => error!("Staging failed: {}", err),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(err.into())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError(err.into())
    }
}

impl From<StagingError> for ApiError {
    fn from(err: StagingError) -> Self {
        ApiError(err.into())
    }
}
