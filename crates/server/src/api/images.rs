use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use chrono::Utc;
use ospry_client::{Metadata, RenderOpts};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::error::DemoError;

const IMAGES_PATH: &str = "/images";

#[derive(Debug, Deserialize)]
pub struct MethodForm {
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    #[serde(rename = "privateUrl")]
    pub private_url: String,
}

#[derive(Serialize)]
struct IndexContext<'a> {
    public_urls: Vec<String>,
    private_urls: Vec<String>,
    public_key: &'a str,
}

/// Sign `metadata.url` so it stays downloadable while private.
fn private_url(state: &AppState, metadata: &Metadata) -> Result<String, DemoError> {
    let expires = Utc::now()
        .checked_add_signed(state.signed_url_ttl)
        .ok_or_else(|| DemoError::Config("signed URL expiry out of range".into()))?;
    Ok(state
        .host
        .format_url(&metadata.url, &RenderOpts::new().with_time_expired(expires))?)
}

/// `GET /` redirects to the image list.
pub async fn root() -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, IMAGES_PATH)]).into_response()
}

/// `GET /images` renders every stored image, public and signed.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, DemoError> {
    let images = state.store.list().await?;

    let mut public_urls = Vec::with_capacity(images.len());
    let mut private_urls = Vec::with_capacity(images.len());
    for metadata in &images {
        private_urls.push(private_url(&state, metadata)?);
        public_urls.push(metadata.url.clone());
    }

    let page = state.templates.get_template("index.html")?.render(IndexContext {
        public_urls,
        private_urls,
        public_key: &state.public_key,
    })?;
    Ok(Html(page))
}

/// `POST /images` uploads multipart `file` parts, or deletes every image
/// when sent as a form with `method=DELETE`.
pub async fn upload_or_delete(
    State(state): State<AppState>,
    req: Request,
) -> Result<Redirect, DemoError> {
    let is_form = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(form) = Form::<MethodForm>::from_request(req, &state)
            .await
            .map_err(|e| DemoError::BadRequest(e.body_text()))?;
        if form.method.as_deref() == Some("DELETE") {
            return delete_all(&state).await;
        }
        return Err(DemoError::BadRequest(
            "expected multipart/form-data or method=DELETE".into(),
        ));
    }

    let mut multipart = Multipart::from_request(req, &state)
        .await
        .map_err(|e| DemoError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DemoError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        let data = field
            .bytes()
            .await
            .map_err(|e| DemoError::BadRequest(e.body_text()))?;

        match state.host.upload_private(&filename, data).await {
            Ok(metadata) => {
                info!(id = %metadata.id, filename = %filename, "image uploaded");
                state.store.insert(metadata).await?;
            }
            Err(e) => warn!(filename = %filename, error = %e, "upload failed, skipping"),
        }
    }

    Ok(Redirect::to(IMAGES_PATH))
}

async fn delete_all(state: &AppState) -> Result<Redirect, DemoError> {
    for metadata in state.store.list().await? {
        state.host.delete(&metadata.id).await?;
        state.store.delete(&metadata.id).await?;
    }
    Ok(Redirect::to(IMAGES_PATH))
}

async fn set_all_private(state: &AppState, is_private: bool) -> Result<Redirect, DemoError> {
    for metadata in state.store.list().await? {
        state.host.set_private(&metadata.id, is_private).await?;
    }
    Ok(Redirect::to(IMAGES_PATH))
}

/// `POST /make-private` hides every stored image behind signed URLs.
pub async fn make_private(State(state): State<AppState>) -> Result<Redirect, DemoError> {
    set_all_private(&state, true).await
}

/// `POST /make-public` exposes every stored image.
pub async fn make_public(State(state): State<AppState>) -> Result<Redirect, DemoError> {
    set_all_private(&state, false).await
}

/// `POST /claim` claims an image uploaded from the browser and returns a
/// signed URL for it.
pub async fn claim(
    State(state): State<AppState>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>, DemoError> {
    let Json(req) = body.map_err(|e| DemoError::BadRequest(e.body_text()))?;

    let metadata = state.host.claim(&req.id).await?;
    let private_url = private_url(&state, &metadata)?;
    state.store.insert(metadata).await?;

    Ok(Json(ClaimResponse { private_url }))
}
