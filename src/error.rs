// src/error.rs
//
// Unified error handling for jpegme
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - Acquisition: source image could not be fetched/decoded before the engine ran
// - Validation: out-of-range or unparsable parameters, engine never invoked
// - Codec: encode/decode failure inside the degradation loop, terminal
// - Timeout: service-layer deadline expired, work discarded

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy. Every error is terminal for its invocation - there is no
/// retry or partial-success path anywhere in the degradation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fetch failure, oversized payload, bad upstream status, malformed
    /// inline data, unsupported/corrupt source
    Acquisition,
    /// Out-of-range or unparsable parameters
    Validation,
    /// Encode or decode failure at any generation
    Codec,
    /// Wall-clock deadline exceeded around acquisition + degradation
    Timeout,
}

impl ErrorCategory {
    /// Service-layer response status for this category.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCategory::Validation => 400,
            ErrorCategory::Timeout => 504,
            ErrorCategory::Acquisition | ErrorCategory::Codec => 500,
        }
    }
}

/// jpegme error types
#[derive(Debug, Error)]
pub enum JpegmeError {
    // Acquisition errors
    #[error("failed to fetch '{url}': {source}")]
    FetchFailed {
        url: Cow<'static, str>,
        #[source]
        source: reqwest::Error,
    },

    #[error("bad status code from upstream server: {status}")]
    BadUpstreamStatus { status: u16 },

    #[error("requested image is too large: {size} bytes (limit {max})")]
    SourceTooLarge { size: u64, max: u64 },

    #[error("invalid inline image data: {message}")]
    InvalidInlineData { message: Cow<'static, str> },

    #[error("source is not an image: {detected}")]
    NotAnImage { detected: Cow<'static, str> },

    #[error("failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Validation errors
    #[error("invalid value for {name}: {value}. {reason}")]
    InvalidParameter {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("unsupported output extension: '{extension}'. Expected jpg, jpeg, png, or gif")]
    UnsupportedOutputFormat { extension: Cow<'static, str> },

    // Codec errors
    #[error("failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Timeout
    #[error("request exceeded the {seconds}s deadline")]
    DeadlineExceeded { seconds: u64 },
}

// Constructor Helpers
impl JpegmeError {
    pub fn fetch_failed(url: impl Into<Cow<'static, str>>, source: reqwest::Error) -> Self {
        Self::FetchFailed {
            url: url.into(),
            source,
        }
    }

    pub fn bad_upstream_status(status: u16) -> Self {
        Self::BadUpstreamStatus { status }
    }

    pub fn source_too_large(size: u64, max: u64) -> Self {
        Self::SourceTooLarge { size, max }
    }

    pub fn invalid_inline_data(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidInlineData {
            message: message.into(),
        }
    }

    pub fn not_an_image(detected: impl Into<Cow<'static, str>>) -> Self {
        Self::NotAnImage {
            detected: detected.into(),
        }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_parameter(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_output_format(extension: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedOutputFormat {
            extension: extension.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn deadline_exceeded(seconds: u64) -> Self {
        Self::DeadlineExceeded { seconds }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FetchFailed { .. }
            | Self::BadUpstreamStatus { .. }
            | Self::SourceTooLarge { .. }
            | Self::InvalidInlineData { .. }
            | Self::NotAnImage { .. }
            | Self::FileReadFailed { .. } => ErrorCategory::Acquisition,

            Self::InvalidParameter { .. } | Self::UnsupportedOutputFormat { .. } => {
                ErrorCategory::Validation
            }

            // FileWriteFailed is a sink failure inside the final encode path;
            // the engine surfaces it the same way as any other codec error.
            Self::DecodeFailed { .. }
            | Self::EncodeFailed { .. }
            | Self::FileWriteFailed { .. } => ErrorCategory::Codec,

            Self::DeadlineExceeded { .. } => ErrorCategory::Timeout,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, JpegmeError>;
