// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The per-request pipeline: normalize, optionally stage, relay

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use super::cloudinary::CloudinaryHost;
use super::error::{RelayError, StagingError};
use super::fal::{FalClient, RelayOutcome};
use super::normalize::{InboundRequest, Normalizer, PreparedImage};
use super::staging::StagingUploader;
use crate::config::RelayConfig;

/// Owns the components for one configured service; shared across requests
pub struct RelayPipeline {
    normalizer: Normalizer,
    staging: Option<StagingUploader>,
    fal: FalClient,
}

impl RelayPipeline {
    /// Build from configuration, using Cloudinary for staging when enabled
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let staging = if config.staging.enabled {
            let host = CloudinaryHost::new(&config.staging)?;
            Some(StagingUploader::new(Arc::new(host)))
        } else {
            None
        };

        Ok(Self::new(
            Normalizer::new(&config.images, config.staging.enabled),
            staging,
            FalClient::new(&config.fal)?,
        ))
    }

    /// Assemble from parts; staging runs only if the normalizer asks for it
    pub fn new(normalizer: Normalizer, staging: Option<StagingUploader>, fal: FalClient) -> Self {
        Self {
            normalizer,
            staging,
            fal,
        }
    }

    pub fn staging_enabled(&self) -> bool {
        self.staging.is_some() && self.normalizer.staging_enabled()
    }

    /// Run one job through to a classified upstream outcome
    pub async fn run(&self, request: InboundRequest) -> Result<RelayOutcome, RelayError> {
        let prepared = self.normalizer.prepare(request)?;

        // No outbound call of any kind without generation credentials
        self.fal.ensure_credentials()?;

        let payload = match prepared {
            PreparedImage::Inline(payload) => payload,
            PreparedImage::Stage(stage) => {
                let uploader = self
                    .staging
                    .as_ref()
                    .ok_or(StagingError::ConfigMissing("staging uploader"))?;
                debug!("Staging {} bytes before relay", stage.bytes.len());
                let asset = uploader.stage(&stage.bytes, &stage.suffix).await?;
                stage.into_payload(asset.public_url)
            }
        };

        let outcome = self.fal.relay(&payload).await?;
        info!("Relay outcome: {}", outcome_label(&outcome));
        Ok(outcome)
    }
}

fn outcome_label(outcome: &RelayOutcome) -> String {
    match outcome {
        RelayOutcome::Success(_) => "success".to_string(),
        RelayOutcome::UpstreamError { status, .. } => format!("upstream error {}", status),
        RelayOutcome::TransportFailure(kind) => format!("transport failure ({})", kind),
        RelayOutcome::Timeout => "timeout".to_string(),
    }
}
