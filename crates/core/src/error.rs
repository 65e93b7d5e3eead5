//! Errors produced while normalizing, building or verifying image URLs.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur when formatting or verifying an image URL.
///
/// None of these involve I/O: they are raised before any network or
/// cryptographic work is attempted, and the operation that produced them
/// returns no partial URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The input (or an embedded `url` parameter) is not a valid absolute URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A query parameter carried a value that could not be parsed.
    #[error("invalid {name} parameter {value:?}: {reason}")]
    InvalidParam {
        /// Query parameter name (e.g. `maxHeight`).
        name: &'static str,
        /// The raw value found in the query string.
        value: String,
        /// Parser error message.
        reason: String,
    },

    /// A render option failed validation (negative dimension, unknown format).
    #[error("validation error: {0}")]
    Validation(String),

    /// The URL carries no signature or no expiration time.
    #[error("url is not signed")]
    MissingSignature,

    /// The signature does not match the URL and expiration time.
    #[error("signature mismatch")]
    InvalidSignature,

    /// The signed URL expired at the given instant.
    #[error("signed url expired at {expired_at}")]
    Expired {
        /// The `timeExpired` value carried by the URL.
        expired_at: DateTime<Utc>,
    },
}

impl FormatError {
    /// Returns `true` if this is a validation failure rather than a parse error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns `true` if the input could not be parsed.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::InvalidParam { .. })
    }
}

impl From<url::ParseError> for FormatError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}
