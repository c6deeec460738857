// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request normalization
//!
//! Turns the inbound shapes (multipart upload, bare base64 text, data URI)
//! into the one payload shape the generation API is called with.
//!
//! Size rule: the ceiling applies to the base64 text of the image payload.
//! For data URIs that is the part after the comma; for raw uploads it is the
//! length the encoding would have, computed before encoding.

use bytes::Bytes;
use std::fmt;
use tracing::debug;
use url::Url;

use super::error::ValidationError;
use super::image_utils::{
    data_uri_payload, decode_base64, encode_data_uri, encoded_len, parse_data_uri, sniff_mime,
    suffix_for_mime, wrap_base64, DATA_URI_PREFIX,
};
use crate::config::ImageConfig;

/// How the image arrived
#[derive(Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Uploaded file bytes; `mime_type` is the part's declared content type
    RawBytes {
        bytes: Bytes,
        mime_type: Option<String>,
    },
    /// Base64 text, possibly without a data-URI prefix
    Base64String(String),
    /// A complete `data:<mime>;base64,<payload>` string
    DataUri(String),
}

impl ImageSource {
    /// Classify base64 text by its prefix
    pub fn from_text(text: String) -> Self {
        if text.starts_with(DATA_URI_PREFIX) {
            ImageSource::DataUri(text)
        } else {
            ImageSource::Base64String(text)
        }
    }

    /// Length of the base64 text this image is (or would be) sent as
    pub fn encoded_size(&self) -> usize {
        match self {
            ImageSource::RawBytes { bytes, .. } => encoded_len(bytes.len()),
            ImageSource::Base64String(text) | ImageSource::DataUri(text) => {
                data_uri_payload(text).len()
            }
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            ImageSource::RawBytes { bytes, .. } => bytes.is_empty(),
            ImageSource::Base64String(text) => text.trim().is_empty(),
            ImageSource::DataUri(text) => data_uri_payload(text).trim().is_empty(),
        }
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::RawBytes { bytes, mime_type } => write!(
                f,
                "RawBytes {{ bytes: <{} bytes>, mime_type: {:?} }}",
                bytes.len(),
                mime_type
            ),
            ImageSource::Base64String(text) => write!(f, "Base64String(<{} chars>)", text.len()),
            ImageSource::DataUri(text) => write!(f, "DataUri(<{} chars>)", text.len()),
        }
    }
}

/// One job request as received
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub prompt: String,
    pub image_source: Option<ImageSource>,
}

impl InboundRequest {
    pub fn new(prompt: impl Into<String>, image_source: Option<ImageSource>) -> Self {
        Self {
            prompt: prompt.into(),
            image_source,
        }
    }
}

/// Image reference in a form the generation API accepts directly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    Url(Url),
    DataUri(String),
}

impl ImageReference {
    pub fn as_str(&self) -> &str {
        match self {
            ImageReference::Url(url) => url.as_str(),
            ImageReference::DataUri(uri) => uri,
        }
    }

    pub fn is_data_uri(&self) -> bool {
        matches!(self, ImageReference::DataUri(_))
    }
}

/// The normalized request sent upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPayload {
    pub prompt: String,
    pub image_reference: ImageReference,
}

/// Raw image bytes waiting to be staged on the media host
#[derive(Clone, PartialEq, Eq)]
pub struct StagingRequest {
    pub prompt: String,
    pub bytes: Bytes,
    /// Temporary file suffix, e.g. `.png`
    pub suffix: String,
}

impl fmt::Debug for StagingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingRequest")
            .field("prompt_len", &self.prompt.len())
            .field("bytes", &self.bytes.len())
            .field("suffix", &self.suffix)
            .finish()
    }
}

impl StagingRequest {
    /// Combine with the hosted URL into the upstream payload
    pub fn into_payload(self, public_url: Url) -> CanonicalPayload {
        CanonicalPayload {
            prompt: self.prompt,
            image_reference: ImageReference::Url(public_url),
        }
    }
}

/// What the pipeline does next with a validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedImage {
    /// Ready to relay with an inline data URI
    Inline(CanonicalPayload),
    /// Needs a staging upload to obtain a URL first
    Stage(StagingRequest),
}

/// Validates inbound requests and decides between the inline and staged paths
#[derive(Debug, Clone)]
pub struct Normalizer {
    default_mime: String,
    max_encoded_bytes: usize,
    staging_enabled: bool,
}

impl Normalizer {
    pub fn new(config: &ImageConfig, staging_enabled: bool) -> Self {
        Self {
            default_mime: config.default_mime.clone(),
            max_encoded_bytes: config.max_encoded_bytes,
            staging_enabled,
        }
    }

    pub fn staging_enabled(&self) -> bool {
        self.staging_enabled
    }

    /// Validate a request and pick its path
    pub fn prepare(&self, request: InboundRequest) -> Result<PreparedImage, ValidationError> {
        let (prompt, source) = self.validate(request)?;

        if self.staging_enabled {
            let (bytes, mime) = self.into_bytes(source)?;
            debug!("Prepared {} bytes of {} for staging", bytes.len(), mime);
            Ok(PreparedImage::Stage(StagingRequest {
                prompt,
                bytes,
                suffix: suffix_for_mime(&mime),
            }))
        } else {
            Ok(PreparedImage::Inline(CanonicalPayload {
                prompt,
                image_reference: ImageReference::DataUri(self.into_data_uri(source)),
            }))
        }
    }

    /// Validate a request and build the inline payload, ignoring the staging setting
    pub fn normalize(&self, request: InboundRequest) -> Result<CanonicalPayload, ValidationError> {
        let (prompt, source) = self.validate(request)?;
        Ok(CanonicalPayload {
            prompt,
            image_reference: ImageReference::DataUri(self.into_data_uri(source)),
        })
    }

    fn validate(&self, request: InboundRequest) -> Result<(String, ImageSource), ValidationError> {
        if request.prompt.trim().is_empty() {
            return Err(ValidationError::MissingField("prompt"));
        }

        let source = match request.image_source {
            Some(source) if !source.is_empty() => source,
            _ => return Err(ValidationError::MissingField("image")),
        };

        // Inline data URIs go upstream unchanged; reject malformed ones here
        match &source {
            ImageSource::DataUri(uri) | ImageSource::Base64String(uri)
                if uri.starts_with(DATA_URI_PREFIX) =>
            {
                let parsed = parse_data_uri(uri)?;
                if parsed.payload.trim().is_empty() {
                    return Err(ValidationError::MissingField("image"));
                }
            }
            _ => {}
        }

        let size = source.encoded_size();
        if size > self.max_encoded_bytes {
            return Err(ValidationError::TooLarge {
                size,
                limit: self.max_encoded_bytes,
            });
        }

        Ok((request.prompt, source))
    }

    fn raw_mime(&self, bytes: &[u8], declared: Option<String>) -> String {
        match declared {
            Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => mime,
            _ => sniff_mime(bytes)
                .map(str::to_string)
                .unwrap_or_else(|| self.default_mime.clone()),
        }
    }

    fn into_data_uri(&self, source: ImageSource) -> String {
        match source {
            ImageSource::RawBytes { bytes, mime_type } => {
                let mime = self.raw_mime(&bytes, mime_type);
                encode_data_uri(&mime, &bytes)
            }
            ImageSource::Base64String(text) if text.starts_with(DATA_URI_PREFIX) => text,
            // Lossy: the real format of bare base64 is unknown here
            ImageSource::Base64String(text) => wrap_base64(&self.default_mime, &text),
            ImageSource::DataUri(uri) => uri,
        }
    }

    fn into_bytes(&self, source: ImageSource) -> Result<(Bytes, String), ValidationError> {
        match source {
            ImageSource::RawBytes { bytes, mime_type } => {
                let mime = self.raw_mime(&bytes, mime_type);
                Ok((bytes, mime))
            }
            ImageSource::Base64String(text) if !text.starts_with(DATA_URI_PREFIX) => {
                let bytes = decode_base64(&text)?;
                Ok((Bytes::from(bytes), self.default_mime.clone()))
            }
            ImageSource::Base64String(uri) | ImageSource::DataUri(uri) => {
                let parsed = parse_data_uri(&uri)?;
                let bytes = decode_base64(parsed.payload)?;
                Ok((Bytes::from(bytes), parsed.mime.to_string()))
            }
        }
    }
}
