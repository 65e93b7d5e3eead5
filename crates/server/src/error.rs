use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur when running the demo server.
#[derive(Debug, Error)]
pub enum DemoError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The request body could not be understood.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The image host rejected a call or could not be reached.
    #[error("image host error: {0}")]
    Host(#[from] ospry_client::Error),

    /// The metadata store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The HTML page could not be rendered.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for DemoError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Host(_) | Self::Store(_) | Self::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
