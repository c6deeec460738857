// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::handlers::health_handler;
use super::jobs::create_job_handler;
use crate::config::RelayConfig;
use crate::relay::RelayPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RelayPipeline>,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(pipeline: RelayPipeline, body_limit: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            body_limit,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Ok(Self::new(
            RelayPipeline::from_config(config)?,
            config.body_limit(),
        ))
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.body_limit;

    Router::new()
        // Liveness
        .route("/", get(health_handler))
        // Job endpoint and its alias
        .route("/api/jobs", post(create_job_handler))
        .route("/api/generate", post(create_job_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: RelayConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = create_app(state);

    let addr = config.listen_addr.parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Image relay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;

    Ok(())
}
