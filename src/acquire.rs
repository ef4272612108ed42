// src/acquire.rs
//
// Source-image acquisition: URL fetch, inline base64 payloads, local files.
// All validation happens here, before the engine ever runs - oversized
// payloads, bad upstream statuses, and non-image bytes are rejected up front
// and never retried.

use image::DynamicImage;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::engine::CodecRegistry;
use crate::error::{JpegmeError, Result};

/// Upper bound on any acquired source, fetched or inline. 10 MB is a pretty
/// big image.
pub const MAX_SOURCE_BYTES: u64 = 10_000_000;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Where a source image comes from.
pub enum ImageSource {
    /// Fetched over HTTP(S).
    Url(String),
    /// Inline base64 payload (data URI or anything carrying a `;base64,`
    /// marker).
    Inline(String),
    /// Local file (CLI path only; the service never touches the filesystem).
    File(std::path::PathBuf),
}

impl ImageSource {
    /// Classify a service-path source string. The service accepts URLs and
    /// inline data; bare file paths are not a remote surface.
    pub fn classify(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(ImageSource::Url(trimmed.to_string()));
        }
        if trimmed.contains(";base64,") {
            return Ok(ImageSource::Inline(trimmed.to_string()));
        }
        Err(JpegmeError::invalid_inline_data(
            "expected an http(s) URL or a base64 data URI",
        ))
    }
}

/// Resolve a classified source into a decoded raster.
pub async fn resolve_image(source: ImageSource, registry: &CodecRegistry) -> Result<DynamicImage> {
    let bytes = match source {
        ImageSource::Url(url) => fetch_url(&url).await?,
        ImageSource::Inline(data) => load_inline(&data)?,
        ImageSource::File(path) => load_file(&path)?,
    };
    decode_bytes(&bytes, registry).map(|(img, _)| img)
}

/// Signature-check and sniff-decode acquired bytes. Shared by the service
/// path and the CLI.
pub fn decode_bytes(
    bytes: &[u8],
    registry: &CodecRegistry,
) -> Result<(DynamicImage, crate::engine::Format)> {
    validate_signature(bytes)?;
    let (img, format) = registry.sniff_decode(bytes)?;
    log::debug!("decoded {} source ({} bytes)", format, bytes.len());
    Ok((img, format))
}

/// Fetch a source image over HTTP(S).
///
/// Upstream status must be in [200,300) and the body must stay under
/// [`MAX_SOURCE_BYTES`] - checked against the Content-Length header first,
/// then enforced again while streaming in case the header lied.
pub async fn fetch_url(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::Client::new()
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(|e| JpegmeError::fetch_failed(url.to_string(), e))?;

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        return Err(JpegmeError::bad_upstream_status(status));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_SOURCE_BYTES {
            return Err(JpegmeError::source_too_large(len, MAX_SOURCE_BYTES));
        }
    }

    let mut buffer = Vec::new();
    let mut response = response;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| JpegmeError::fetch_failed(url.to_string(), e))?
    {
        if (buffer.len() + chunk.len()) as u64 > MAX_SOURCE_BYTES {
            return Err(JpegmeError::source_too_large(
                (buffer.len() + chunk.len()) as u64,
                MAX_SOURCE_BYTES,
            ));
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}

/// Decode an inline base64 payload. The payload is everything after the
/// `;base64,` marker; a missing marker is invalid data.
pub fn load_inline(data: &str) -> Result<Vec<u8>> {
    let payload = match data.split_once(";base64,") {
        Some((_, payload)) => payload,
        None => return Err(JpegmeError::invalid_inline_data("missing ;base64, marker")),
    };

    // A base64 group of 4 chars decodes to at most 3 bytes; reject oversized
    // payloads before decoding anything.
    let estimated = (payload.len() as u64 + 3) / 4 * 3;
    if estimated > MAX_SOURCE_BYTES {
        return Err(JpegmeError::source_too_large(estimated, MAX_SOURCE_BYTES));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| JpegmeError::invalid_inline_data(format!("base64 decode failed: {e}")))
}

/// Read a local source file (CLI path), size-capped like every other source.
pub fn load_file(path: &Path) -> Result<Vec<u8>> {
    let display = path.display().to_string();
    let metadata = std::fs::metadata(path)
        .map_err(|e| JpegmeError::file_read_failed(display.clone(), e))?;
    if metadata.len() > MAX_SOURCE_BYTES {
        return Err(JpegmeError::source_too_large(
            metadata.len(),
            MAX_SOURCE_BYTES,
        ));
    }
    std::fs::read(path).map_err(|e| JpegmeError::file_read_failed(display, e))
}

/// Magic-byte signature check: reject non-image bytes before decoding.
pub fn validate_signature(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(JpegmeError::not_an_image("empty input"));
    }
    let kind = infer::get(bytes).ok_or_else(|| JpegmeError::not_an_image("unknown signature"))?;
    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(JpegmeError::not_an_image(kind.mime_type().to_string()));
    }
    Ok(())
}
