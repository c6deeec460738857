// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Job request parsing
//!
//! Accepts either `multipart/form-data` (`prompt` text field, `image` file
//! field) or a JSON body `{"prompt": ..., "image_base64": ...}`. Parsing
//! failures are validation errors so they share the job error envelope.

use axum::{
    extract::{FromRequest, Request},
    http::{header, StatusCode},
};
use axum_extra::extract::{multipart::MultipartError, Multipart};
use http_body_util::LengthLimitError;
use std::error::Error as StdError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::relay::{ImageSource, InboundRequest, ValidationError};

/// JSON form of a job request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobJsonRequest {
    /// Text prompt describing the desired edit or generation
    #[serde(default)]
    pub prompt: Option<String>,

    /// Base64 image, with or without a data-URI prefix
    #[serde(default, alias = "image")]
    pub image_base64: Option<String>,
}

impl JobJsonRequest {
    pub fn into_inbound(self) -> InboundRequest {
        InboundRequest::new(
            self.prompt.unwrap_or_default(),
            self.image_base64.map(ImageSource::from_text),
        )
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn content_length(request: &Request) -> Option<usize> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// The body was cut off at `body_limit`; its full size is unknown
fn body_too_large(body_limit: usize) -> ValidationError {
    ValidationError::TooLarge {
        size: body_limit.saturating_add(1),
        limit: body_limit,
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn multipart_error(err: MultipartError, body_limit: usize) -> ValidationError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        body_too_large(body_limit)
    } else {
        ValidationError::MalformedBody(err.to_string())
    }
}

/// Read an HTTP request into an [`InboundRequest`]
pub async fn read_inbound(
    request: Request,
    body_limit: usize,
) -> Result<InboundRequest, ValidationError> {
    if let Some(len) = content_length(&request) {
        if len > body_limit {
            return Err(ValidationError::TooLarge {
                size: len,
                limit: body_limit,
            });
        }
    }

    if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
        read_multipart(multipart, body_limit).await
    } else {
        let body = axum::body::to_bytes(request.into_body(), body_limit)
            .await
            .map_err(|e| {
                if is_length_limit(&e) {
                    body_too_large(body_limit)
                } else {
                    ValidationError::MalformedBody(e.to_string())
                }
            })?;
        let parsed: JobJsonRequest = serde_json::from_slice(&body)
            .map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
        Ok(parsed.into_inbound())
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    body_limit: usize,
) -> Result<InboundRequest, ValidationError> {
    let mut prompt = String::new();
    let mut image_source = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, body_limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => {
                prompt = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, body_limit))?;
            }
            "image" => {
                let mime_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, body_limit))?;
                debug!("Multipart image: {} bytes, {:?}", bytes.len(), mime_type);
                image_source = Some(ImageSource::RawBytes { bytes, mime_type });
            }
            "image_base64" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, body_limit))?;
                image_source = Some(ImageSource::from_text(text));
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(InboundRequest::new(prompt, image_source))
}
