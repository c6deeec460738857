// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Staging uploads
//!
//! Some generation models only accept a URL for the input image. The image is
//! written to a temporary file, uploaded to a media host, and the host's public
//! URL is sent upstream instead. The temporary file is owned by a
//! [`tempfile::NamedTempFile`] guard, so it is removed when the upload
//! succeeds, when it fails, and when the request future is dropped mid-upload.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::error::StagingError;

const TEMP_PREFIX: &str = "image-relay-";

/// A media host that turns a local file into a public URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload the file at `path` and return its public URL
    async fn upload(&self, path: &Path) -> Result<Url, StagingError>;
}

/// Result of a completed staging upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    /// Where the bytes were written; already removed when this value exists
    pub local_temp_path: PathBuf,
    pub public_url: Url,
}

/// Writes image bytes to a scoped temporary file and uploads it
#[derive(Clone)]
pub struct StagingUploader {
    host: Arc<dyn MediaHost>,
    temp_dir: Option<PathBuf>,
}

impl StagingUploader {
    pub fn new(host: Arc<dyn MediaHost>) -> Self {
        Self {
            host,
            temp_dir: None,
        }
    }

    /// Create temporary files under `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Stage `bytes` and return the hosted URL
    pub async fn stage(&self, bytes: &[u8], suffix: &str) -> Result<StagedAsset, StagingError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(suffix);
        let temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        // Guard keeps ownership of the file; the write runs off the runtime thread
        let local_temp_path = temp.path().to_path_buf();
        tokio::fs::write(&local_temp_path, bytes).await?;
        debug!(
            "Staging {} bytes via {}",
            bytes.len(),
            local_temp_path.display()
        );

        let uploaded = self.host.upload(&local_temp_path).await;

        // Removal happens here on both paths; the guard's destructor covers cancellation
        if let Err(e) = temp.close() {
            warn!(
                "Failed to remove staged file {}: {}",
                local_temp_path.display(),
                e
            );
        }

        let public_url = uploaded?;
        info!("Staged image at {}", public_url);

        Ok(StagedAsset {
            local_temp_path,
            public_url,
        })
    }
}
