//! Error types for the Ospry client.

use ospry_core::FormatError;
use thiserror::Error;

/// Errors that can occur when using the Ospry client.
#[derive(Debug, Error)]
pub enum Error {
    /// The image URL or render options were rejected before any request.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Error envelope returned by the API.
    #[error("API error [{status}] {cause}: {message}")]
    Api {
        /// HTTP status code reported in the envelope.
        status: u16,
        /// Machine-readable cause.
        cause: String,
        /// Human-readable message.
        message: String,
    },

    /// Non-success HTTP status without an error envelope.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// Connection error (network failure, DNS resolution, timeout, etc.).
    #[error("connection error: {0}")]
    Connection(String),

    /// Response deserialization error.
    #[error("failed to deserialize response: {0}")]
    Deserialization(String),

    /// Client configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Returns `true` if this error is retryable.
    ///
    /// Connection errors and 5xx statuses (plain or enveloped) return `true`.
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Http { status, .. } | Self::Api { status, .. } => *status >= 500,
            Self::Format(_) | Self::Deserialization(_) | Self::Configuration(_) => false,
        }
    }

    /// Returns `true` if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if this is an API error envelope.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Returns `true` if the image does not exist (e.g. after a delete).
    pub fn is_not_found(&self) -> bool {
        self.api_status() == Some(404)
    }

    /// HTTP status code carried by API and HTTP errors.
    pub fn api_status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
