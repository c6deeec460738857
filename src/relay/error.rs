// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the relay pipeline
//!
//! One enum per component. Outcomes that are not faults of this service
//! (the generation API rejecting a request, timing out, or being unreachable)
//! are [`RelayOutcome`](super::fal::RelayOutcome) variants, not errors.

use thiserror::Error;

/// The caller's request is malformed or oversized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("image is too large: {size} bytes of base64 (max: {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("image is not valid base64: {0}")]
    InvalidEncoding(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

/// The service is misconfigured
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Staging the image on the media host failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    #[error("media host credentials are not configured: {0}")]
    ConfigMissing(&'static str),

    #[error("media host rejected upload with status {status}: {body}")]
    UploadRejected { status: u16, body: String },

    #[error("media host request failed: {0}")]
    Transport(String),

    #[error("media host returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("temporary file error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StagingError {
    fn from(err: std::io::Error) -> Self {
        StagingError::Io(err.to_string())
    }
}

/// Any failure that stops a job before the generation API classifies it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Staging(#[from] StagingError),
}
