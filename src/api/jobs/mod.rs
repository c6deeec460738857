// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Job endpoint module
//!
//! Provides POST /api/jobs (and its alias POST /api/generate) for
//! prompt + image generation requests.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::create_job_handler;
pub use request::{read_inbound, JobJsonRequest};
pub use response::JobSuccessResponse;
