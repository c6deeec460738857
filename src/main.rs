// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use image_relay::{api::start_server, version, RelayConfig};
use std::env;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = RelayConfig::parse();

    info!("Starting image relay v{} ({})", version::VERSION_NUMBER, version::BUILD_DATE);
    info!("Features: {}", version::FEATURES.join(", "));
    info!("Generation endpoint: {}", config.fal.url);

    if config.fal.api_key.is_none() {
        warn!("FAL_API_KEY is not set; job requests will fail until it is configured");
    }
    if config.staging.enabled {
        info!("Image staging enabled via {}", config.staging.base_url);
        if config.staging.cloud_name.is_none()
            || config.staging.api_key.is_none()
            || config.staging.api_secret.is_none()
        {
            warn!("Image staging is enabled but CLOUD_NAME, CLOUD_API_KEY or CLOUD_API_SECRET is missing");
        }
    }

    start_server(config).await
}
