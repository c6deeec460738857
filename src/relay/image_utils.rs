// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Data URI and image format helpers

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;

use super::error::ValidationError;

/// Scheme prefix shared by every data URI
pub const DATA_URI_PREFIX: &str = "data:";

const BASE64_MARKER: &str = ";base64";

/// Detect image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.len() < 4 {
        return None;
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Some(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Some(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Some(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some(ImageFormat::Tiff),

        _ => None,
    }
}

/// MIME type implied by the magic bytes, if recognised
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    detect_format(bytes).map(|format| format.to_mime_type())
}

/// File suffix (with leading dot) for a MIME type, `.bin` when unknown
pub fn suffix_for_mime(mime: &str) -> String {
    let ext = ImageFormat::from_mime_type(mime)
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin");
    format!(".{}", ext)
}

/// Length of the padded base64 text for `len` raw bytes
pub fn encoded_len(len: usize) -> usize {
    base64::encoded_len(len, true).unwrap_or(usize::MAX)
}

/// Build `data:<mime>;base64,<payload>` from raw bytes
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("{}{}{},{}", DATA_URI_PREFIX, mime, BASE64_MARKER, STANDARD.encode(bytes))
}

/// Build a data URI around base64 text that is already encoded
pub fn wrap_base64(mime: &str, payload: &str) -> String {
    format!("{}{}{},{}", DATA_URI_PREFIX, mime, BASE64_MARKER, payload)
}

/// The payload of a data URI (everything after the first comma), or the
/// whole string when there is no comma
pub fn data_uri_payload(uri: &str) -> &str {
    match uri.split_once(',') {
        Some((_, payload)) => payload,
        None => uri,
    }
}

/// A data URI split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDataUri<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

/// Split a base64 data URI into MIME type and payload
pub fn parse_data_uri(uri: &str) -> Result<ParsedDataUri<'_>, ValidationError> {
    let rest = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| ValidationError::InvalidEncoding("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ValidationError::InvalidEncoding("data URI has no payload".to_string()))?;
    let mime = header.strip_suffix(BASE64_MARKER).ok_or_else(|| {
        ValidationError::InvalidEncoding("data URI is not base64 encoded".to_string())
    })?;

    Ok(ParsedDataUri { mime, payload })
}

/// Decode base64 text into raw bytes
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, ValidationError> {
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ValidationError::InvalidEncoding(e.to_string()))
}
