// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cloudinary media host client for staging uploads

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

use super::error::StagingError;
use super::staging::MediaHost;
use crate::config::StagingConfig;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

struct Credentials<'a> {
    cloud_name: &'a str,
    api_key: &'a str,
    api_secret: &'a str,
}

/// Uploads staged images with Cloudinary's signed upload API
pub struct CloudinaryHost {
    client: Client,
    base_url: String,
    cloud_name: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
}

impl CloudinaryHost {
    /// Create a host client; missing credentials are reported per upload
    pub fn new(config: &StagingConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cloud_name: non_empty(&config.cloud_name),
            api_key: non_empty(&config.api_key),
            api_secret: non_empty(&config.api_secret),
        })
    }

    /// Whether all three credentials are present
    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> Result<Credentials<'_>, StagingError> {
        Ok(Credentials {
            cloud_name: self
                .cloud_name
                .as_deref()
                .ok_or(StagingError::ConfigMissing("CLOUD_NAME"))?,
            api_key: self
                .api_key
                .as_deref()
                .ok_or(StagingError::ConfigMissing("CLOUD_API_KEY"))?,
            api_secret: self
                .api_secret
                .as_deref()
                .ok_or(StagingError::ConfigMissing("CLOUD_API_SECRET"))?,
        })
    }

    fn upload_url(&self, cloud_name: &str) -> String {
        format!("{}/v1_1/{}/image/upload", self.base_url, cloud_name)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Signature over the signed upload parameters: hex(sha256("timestamp=<ts>" + secret))
pub fn sign_upload(timestamp: i64, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("timestamp={}", timestamp).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, path: &Path) -> Result<Url, StagingError> {
        let credentials = self.credentials()?;

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign_upload(timestamp, credentials.api_secret);

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(file_name))
            .text("api_key", credentials.api_key.to_string())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = self.upload_url(credentials.cloud_name);
        debug!("Cloudinary upload POST {}", url);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StagingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Cloudinary rejected upload: {} {}", status, body);
            return Err(StagingError::UploadRejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| StagingError::InvalidResponse(e.to_string()))?;

        let secure_url = parsed
            .secure_url
            .ok_or_else(|| StagingError::InvalidResponse("no secure_url in response".to_string()))?;

        Url::parse(&secure_url).map_err(|e| StagingError::InvalidResponse(e.to_string()))
    }
}
