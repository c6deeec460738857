// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! fal.ai generation client
//!
//! Issues exactly one request per job and classifies the result. There are
//! no retries: a failed or timed-out call is reported to the caller as such.

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::error::ConfigError;
use super::normalize::CanonicalPayload;
use crate::config::FalConfig;

/// Network-layer failure talking to the generation API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Could not connect (DNS, refused, TLS)
    Connect,
    /// The request failed after connecting (reset, protocol error)
    Request,
    /// Reading the response body failed
    Body,
    /// A 200 response whose body was not JSON
    Decode,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransportKind::Connect => "connection to upstream failed",
            TransportKind::Request => "upstream request failed",
            TransportKind::Body => "reading upstream response failed",
            TransportKind::Decode => "upstream returned a malformed response",
        };
        f.write_str(text)
    }
}

impl From<&reqwest::Error> for TransportKind {
    fn from(err: &reqwest::Error) -> Self {
        if err.is_connect() {
            TransportKind::Connect
        } else if err.is_decode() {
            TransportKind::Decode
        } else if err.is_body() {
            TransportKind::Body
        } else {
            TransportKind::Request
        }
    }
}

/// Classified result of one generation call
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// Upstream answered 200 with a JSON body
    Success(Value),
    /// Upstream answered with any other status
    UpstreamError { status: u16, body: Value },
    TransportFailure(TransportKind),
    Timeout,
}

impl RelayOutcome {
    fn from_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayOutcome::Timeout
        } else {
            RelayOutcome::TransportFailure(TransportKind::from(err))
        }
    }
}

/// Client for the hosted generation endpoint
pub struct FalClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    image_field: String,
    wrap_input: bool,
}

impl FalClient {
    pub fn new(config: &FalConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        let api_key = config
            .api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        info!(
            "Generation client configured: endpoint={}, image_field={}, timeout={}s",
            config.url, config.image_field, config.timeout_secs
        );

        Ok(Self {
            client,
            endpoint: config.url.clone(),
            api_key,
            image_field: config.image_field.clone(),
            wrap_input: config.wrap_input,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fail unless an API key is configured
    pub fn ensure_credentials(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("FAL_API_KEY"))
    }

    /// JSON body for a payload, shaped by the configured field name and wrapping
    pub fn request_body(&self, payload: &CanonicalPayload) -> Value {
        let mut input = serde_json::Map::new();
        input.insert("prompt".to_string(), json!(payload.prompt));
        input.insert(
            self.image_field.clone(),
            json!(payload.image_reference.as_str()),
        );

        if self.wrap_input {
            json!({ "input": Value::Object(input) })
        } else {
            Value::Object(input)
        }
    }

    /// Send one generation request and classify the response
    pub async fn relay(&self, payload: &CanonicalPayload) -> Result<RelayOutcome, ConfigError> {
        let api_key = self.ensure_credentials()?;
        let body = self.request_body(payload);
        let start = Instant::now();

        debug!(
            "Generation POST {} (prompt_len={}, inline_image={})",
            self.endpoint,
            payload.prompt.len(),
            payload.image_reference.is_data_uri()
        );

        let response = match self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Key {}", api_key))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Generation request failed: {}", e);
                return Ok(RelayOutcome::from_error(&e));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Reading generation response failed: {}", e);
                return Ok(RelayOutcome::from_error(&e));
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;

        if status == StatusCode::OK {
            return Ok(match serde_json::from_str::<Value>(&text) {
                Ok(json) => {
                    info!("Generation succeeded in {}ms", elapsed_ms);
                    RelayOutcome::Success(json)
                }
                Err(e) => {
                    warn!("Generation returned 200 with a non-JSON body: {}", e);
                    RelayOutcome::TransportFailure(TransportKind::Decode)
                }
            });
        }

        warn!(
            "Generation API error after {}ms: {} {}",
            elapsed_ms, status, text
        );
        let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| {
            json!({
                "error": format!("upstream returned status {}", status.as_u16()),
                "details": text,
            })
        });

        Ok(RelayOutcome::UpstreamError {
            status: status.as_u16(),
            body,
        })
    }
}
