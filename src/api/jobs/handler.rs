// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Job endpoint handler

use axum::extract::{Request, State};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::request::read_inbound;
use crate::api::http_server::AppState;
use crate::api::response_formatter::{translate, translate_error, JobResponse};

/// POST /api/jobs - Relay a prompt + image to the generation API
///
/// Pipeline:
/// 1. Read multipart or JSON body into an inbound request
/// 2. Normalize (size guard, data URI or staging decision)
/// 3. Check generation credentials
/// 4. Stage the image on the media host (staging mode only)
/// 5. Call the generation API once
/// 6. Translate the outcome to the outward status/body contract
pub async fn create_job_handler(State(state): State<AppState>, request: Request) -> JobResponse {
    let request_id = Uuid::new_v4();
    let span = info_span!("job", %request_id);

    async move {
        let inbound = match read_inbound(request, state.body_limit).await {
            Ok(inbound) => inbound,
            Err(e) => return translate_error(e.into()),
        };

        info!(
            "Job received: prompt_len={}, image={:?}",
            inbound.prompt.len(),
            inbound.image_source
        );

        let response = translate(state.pipeline.run(inbound).await);
        info!("Job finished with status {}", response.status.as_u16());
        response
    }
    .instrument(span)
    .await
}
