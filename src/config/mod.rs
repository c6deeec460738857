// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Built once at startup from command-line flags and environment variables
//! (a `.env` file is loaded first by the binary) and shared read-only with the
//! relay pipeline. Nothing inside request handling reads the environment.

use clap::{Args, Parser};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_FAL_URL: &str = "https://fal.run/fal-ai/flux-pro/kontext";
pub const DEFAULT_FAL_IMAGE_FIELD: &str = "image_url";
pub const DEFAULT_FAL_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com";
pub const DEFAULT_STAGING_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Ceiling on the base64 text of an image payload (7 MiB, about 5.25 MiB raw)
pub const DEFAULT_MAX_ENCODED_IMAGE_BYTES: usize = 7 * 1024 * 1024;

/// Image relay service configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "image-relay")]
#[command(version)]
#[command(about = "Relay prompt + image requests to a hosted image generation API", long_about = None)]
pub struct RelayConfig {
    /// Address the HTTP server binds to
    #[arg(long, env = "LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: String,

    #[command(flatten)]
    pub fal: FalConfig,

    #[command(flatten)]
    pub staging: StagingConfig,

    #[command(flatten)]
    pub images: ImageConfig,
}

/// Generation API settings
#[derive(Args, Clone)]
pub struct FalConfig {
    /// fal.ai API key; requests fail with 500 until it is set
    #[arg(id = "fal_api_key", long = "fal-api-key", env = "FAL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Generation endpoint
    #[arg(long = "fal-url", env = "FAL_URL", default_value = DEFAULT_FAL_URL)]
    pub url: String,

    /// Name of the JSON field carrying the image reference (varies by model)
    #[arg(long = "fal-image-field", env = "FAL_IMAGE_FIELD", default_value = DEFAULT_FAL_IMAGE_FIELD)]
    pub image_field: String,

    /// Wrap the request body as {"input": {...}}
    #[arg(long = "fal-wrap-input", env = "FAL_WRAP_INPUT")]
    pub wrap_input: bool,

    /// Upper bound on one generation call, in seconds
    #[arg(id = "fal_timeout_secs", long = "fal-timeout-secs", env = "FAL_TIMEOUT_SECS", default_value_t = DEFAULT_FAL_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

/// Media host settings for the staging path
#[derive(Args, Clone)]
pub struct StagingConfig {
    /// Upload images to the media host and send its URL upstream instead of a data URI
    #[arg(long = "image-staging", env = "IMAGE_STAGING")]
    pub enabled: bool,

    #[arg(long = "cloud-name", env = "CLOUD_NAME")]
    pub cloud_name: Option<String>,

    #[arg(id = "cloud_api_key", long = "cloud-api-key", env = "CLOUD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long = "cloud-api-secret", env = "CLOUD_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Media host API base URL
    #[arg(long = "cloudinary-base-url", env = "CLOUDINARY_BASE_URL", default_value = DEFAULT_CLOUDINARY_BASE_URL)]
    pub base_url: String,

    /// Upper bound on one staging upload, in seconds
    #[arg(id = "staging_timeout_secs", long = "staging-timeout-secs", env = "STAGING_TIMEOUT_SECS", default_value_t = DEFAULT_STAGING_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

/// Inbound image handling
#[derive(Args, Debug, Clone)]
pub struct ImageConfig {
    /// MIME type assumed for bare base64 strings. This is a guess, not an inference:
    /// a PNG sent without a data-URI prefix is labelled with this type regardless.
    #[arg(long = "default-image-mime", env = "DEFAULT_IMAGE_MIME", default_value = DEFAULT_IMAGE_MIME)]
    pub default_mime: String,

    /// Maximum length of the base64 text of an image payload
    #[arg(long = "max-encoded-image-bytes", env = "MAX_ENCODED_IMAGE_BYTES", default_value_t = DEFAULT_MAX_ENCODED_IMAGE_BYTES)]
    pub max_encoded_bytes: usize,
}

impl FalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StagingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RelayConfig {
    /// Largest request body accepted by the HTTP layer.
    ///
    /// Multipart uploads carry raw bytes, which are 3/4 of their base64 size,
    /// so twice the encoded ceiling leaves room for form overhead while still
    /// letting oversize images reach the size guard.
    pub fn body_limit(&self) -> usize {
        self.images.max_encoded_bytes.saturating_mul(2)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            fal: FalConfig::default(),
            staging: StagingConfig::default(),
            images: ImageConfig::default(),
        }
    }
}

impl Default for FalConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_FAL_URL.to_string(),
            image_field: DEFAULT_FAL_IMAGE_FIELD.to_string(),
            wrap_input: false,
            timeout_secs: DEFAULT_FAL_TIMEOUT_SECS,
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cloud_name: None,
            api_key: None,
            api_secret: None,
            base_url: DEFAULT_CLOUDINARY_BASE_URL.to_string(),
            timeout_secs: DEFAULT_STAGING_TIMEOUT_SECS,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            default_mime: DEFAULT_IMAGE_MIME.to_string(),
            max_encoded_bytes: DEFAULT_MAX_ENCODED_IMAGE_BYTES,
        }
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<set>",
        None => "<unset>",
    }
}

impl fmt::Debug for FalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FalConfig")
            .field("api_key", &redact(&self.api_key))
            .field("url", &self.url)
            .field("image_field", &self.image_field)
            .field("wrap_input", &self.wrap_input)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for StagingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingConfig")
            .field("enabled", &self.enabled)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
