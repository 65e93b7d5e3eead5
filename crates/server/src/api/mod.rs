pub mod health;
pub mod images;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::error::DemoError;
use crate::host::ImageHost;
use crate::store::MetadataStore;

/// Maximum accepted request body (multipart uploads).
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Fuel limit for `MiniJinja` template evaluation.
const FUEL_LIMIT: u64 = 100_000;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The remote image host.
    pub host: Arc<dyn ImageHost>,
    /// Local record of known images.
    pub store: Arc<dyn MetadataStore>,
    /// Public key handed to the browser uploader.
    pub public_key: String,
    /// Lifetime of the signed URLs handed to the page.
    pub signed_url_ttl: chrono::Duration,
    /// Compiled page templates.
    pub templates: Arc<minijinja::Environment<'static>>,
}

impl AppState {
    /// Build the state and compile the page templates.
    pub fn new(
        host: Arc<dyn ImageHost>,
        store: Arc<dyn MetadataStore>,
        public_key: impl Into<String>,
        signed_url_ttl: chrono::Duration,
    ) -> Result<Self, DemoError> {
        let mut env = minijinja::Environment::new();
        env.set_fuel(Some(FUEL_LIMIT));
        env.add_template("index.html", INDEX_TEMPLATE)?;

        Ok(Self {
            host,
            store,
            public_key: public_key.into(),
            signed_url_ttl,
            templates: Arc::new(env),
        })
    }
}

/// Build the Axum router with all demo routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(images::root))
        .route("/images", get(images::index).post(images::upload_or_delete))
        .route("/make-private", post(images::make_private))
        .route("/make-public", post(images::make_public))
        .route("/claim", post(images::claim))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
