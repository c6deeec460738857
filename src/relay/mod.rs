// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prompt + image relay to a hosted generation API, with optional media-host staging

pub mod cloudinary;
pub mod error;
pub mod fal;
pub mod image_utils;
pub mod normalize;
pub mod pipeline;
pub mod staging;

pub use cloudinary::CloudinaryHost;
pub use error::{ConfigError, RelayError, StagingError, ValidationError};
pub use fal::{FalClient, RelayOutcome, TransportKind};
pub use normalize::{
    CanonicalPayload, ImageReference, ImageSource, InboundRequest, Normalizer, PreparedImage,
    StagingRequest,
};
pub use pipeline::RelayPipeline;
pub use staging::{MediaHost, StagedAsset, StagingUploader};
