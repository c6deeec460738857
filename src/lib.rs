// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod relay;
pub mod version;

pub use config::RelayConfig;
pub use relay::{CanonicalPayload, InboundRequest, RelayError, RelayOutcome, RelayPipeline};
