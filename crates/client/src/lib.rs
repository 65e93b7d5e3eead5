//! Ospry HTTP Client
//!
//! A native Rust client for the Ospry image-hosting REST API.
//!
//! # Quick Start
//!
//! ```no_run
//! use ospry_client::{OspryClient, RenderOpts};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ospry_client::Error> {
//!     let client = OspryClient::new("sk-test-...");
//!
//!     // Upload a private image
//!     let data = std::fs::read("cat.png").unwrap();
//!     let metadata = client.upload_private("cat.png", data).await?;
//!
//!     // Hand out a link that stops working in five minutes
//!     let expires = chrono::Utc::now() + chrono::Duration::minutes(5);
//!     let url = client.format_url(
//!         &metadata.url,
//!         &RenderOpts::new().with_max_width(400).with_time_expired(expires),
//!     )?;
//!     println!("{url}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```no_run
//! use ospry_client::OspryClientBuilder;
//! use std::time::Duration;
//!
//! let client = OspryClientBuilder::new("sk-test-...")
//!     .server_url("https://api.ospry.io/v1")
//!     .timeout(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//! ```

mod error;

pub use error::Error;

// Re-export the core so callers don't need a direct `ospry_core` dependency.
pub use ospry_core::{
    ApiError, DEFAULT_API_HOST, Envelope, FormatError, ImageFormat, Metadata, RenderOpts,
    UrlFormatter,
};

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::{debug, warn};

/// Default API endpoint.
pub const DEFAULT_SERVER_URL: &str = "https://api.ospry.io/v1";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters escaped when an image id is placed in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// HTTP client for the Ospry image-hosting API.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Clone)]
pub struct OspryClient {
    client: Client,
    server_url: String,
    key: String,
    formatter: UrlFormatter,
}

impl fmt::Debug for OspryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OspryClient")
            .field("server_url", &self.server_url)
            .field("key", &"<redacted>")
            .field("api_host", &self.formatter.api_host())
            .finish_non_exhaustive()
    }
}

/// Builder for configuring an [`OspryClient`].
pub struct OspryClientBuilder {
    key: String,
    server_url: String,
    api_host: String,
    timeout: Duration,
    client: Option<Client>,
}

impl fmt::Debug for OspryClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OspryClientBuilder")
            .field("server_url", &self.server_url)
            .field("api_host", &self.api_host)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OspryClientBuilder {
    /// Create a new builder for the given secret key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            server_url: DEFAULT_SERVER_URL.to_owned(),
            api_host: DEFAULT_API_HOST.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    /// Set the API endpoint. A trailing `/` is ignored.
    #[must_use]
    pub fn server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Set the host that serves signed URLs.
    #[must_use]
    pub fn api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom reqwest Client.
    ///
    /// Useful for configuring TLS, proxies, or other advanced settings.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<OspryClient, Error> {
        if self.key.is_empty() {
            return Err(Error::Configuration("secret key must not be empty".into()));
        }

        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::Configuration(e.to_string()))?,
        };

        let formatter = UrlFormatter::new(&self.key).with_api_host(self.api_host);

        Ok(OspryClient {
            client,
            server_url: self.server_url,
            key: self.key,
            formatter,
        })
    }
}

#[derive(Serialize)]
struct ClaimPatch {
    #[serde(rename = "isClaimed")]
    is_claimed: bool,
}

#[derive(Serialize)]
struct PrivacyPatch {
    #[serde(rename = "isPrivate")]
    is_private: bool,
}

impl OspryClient {
    /// Create a new client with default configuration.
    ///
    /// Panics if `key` is empty; use [`OspryClientBuilder`] to handle that
    /// case as an error.
    pub fn new(key: impl Into<String>) -> Self {
        OspryClientBuilder::new(key)
            .build()
            .expect("default client configuration should not fail")
    }

    /// Create a builder for advanced configuration.
    pub fn builder(key: impl Into<String>) -> OspryClientBuilder {
        OspryClientBuilder::new(key)
    }

    /// Get the API endpoint.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// The URL formatter bound to this client's secret key.
    pub fn formatter(&self) -> &UrlFormatter {
        &self.formatter
    }

    fn image_url(&self, id: &str) -> String {
        format!(
            "{}/images/{}",
            self.server_url,
            utf8_percent_encode(id, PATH_SEGMENT)
        )
    }

    /// Send an authenticated request and decode the response envelope.
    async fn execute(&self, req: RequestBuilder) -> Result<Envelope, Error> {
        let req = req
            .basic_auth(&self.key, None::<&str>)
            .build()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        debug!(method = %req.method(), path = req.url().path(), "ospry request");

        let response = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        decode_envelope(status, &body)
    }

    async fn patch<T: Serialize + Sync>(&self, id: &str, patch: &T) -> Result<Metadata, Error> {
        let envelope = self
            .execute(self.client.put(self.image_url(id)).json(patch))
            .await?;
        require_metadata(envelope)
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Upload image bytes under `filename`.
    ///
    /// The content type is derived from the filename extension and falls
    /// back to `image/jpeg`; the service sniffs the real format either way.
    pub async fn upload(
        &self,
        filename: &str,
        data: impl Into<reqwest::Body>,
        is_private: bool,
    ) -> Result<Metadata, Error> {
        let content_type = ImageFormat::from_filename(filename)
            .unwrap_or(ImageFormat::Jpeg)
            .content_type();
        let is_private = if is_private { "true" } else { "false" };

        let req = self
            .client
            .post(format!("{}/images", self.server_url))
            .query(&[("filename", filename), ("isPrivate", is_private)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data);

        require_metadata(self.execute(req).await?)
    }

    /// Upload an image anyone with the URL can download.
    pub async fn upload_public(
        &self,
        filename: &str,
        data: impl Into<reqwest::Body>,
    ) -> Result<Metadata, Error> {
        self.upload(filename, data, false).await
    }

    /// Upload an image that is only reachable through signed URLs.
    pub async fn upload_private(
        &self,
        filename: &str,
        data: impl Into<reqwest::Body>,
    ) -> Result<Metadata, Error> {
        self.upload(filename, data, true).await
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Fetch the metadata of the image with the given id.
    pub async fn get_metadata(&self, id: &str) -> Result<Metadata, Error> {
        let envelope = self.execute(self.client.get(self.image_url(id))).await?;
        require_metadata(envelope)
    }

    /// Claim ownership of an image uploaded client-side.
    ///
    /// Unclaimed images may be removed by the service if claiming is enabled
    /// on the account.
    pub async fn claim(&self, id: &str) -> Result<Metadata, Error> {
        self.patch(id, &ClaimPatch { is_claimed: true }).await
    }

    /// Set the visibility of an image.
    pub async fn set_private(&self, id: &str, is_private: bool) -> Result<Metadata, Error> {
        self.patch(id, &PrivacyPatch { is_private }).await
    }

    /// Make an image private. Private images need a signed URL to download.
    pub async fn make_private(&self, id: &str) -> Result<Metadata, Error> {
        self.set_private(id, true).await
    }

    /// Make an image public.
    pub async fn make_public(&self, id: &str) -> Result<Metadata, Error> {
        self.set_private(id, false).await
    }

    /// Delete an image. Later lookups of the id fail with a 404.
    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        self.execute(self.client.delete(self.image_url(id)))
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Build a rendered (or, with an expiration time, signed) image URL.
    ///
    /// See [`UrlFormatter::format_url`].
    pub fn format_url(&self, url: &str, opts: &RenderOpts) -> Result<String, Error> {
        Ok(self.formatter.format_url(url, opts)?)
    }

    /// Download image bytes, rendered according to `opts`.
    ///
    /// The request carries no credentials: private images need a signed URL,
    /// which `opts.time_expired` produces.
    pub async fn download(&self, url: &str, opts: &RenderOpts) -> Result<Bytes, Error> {
        let url = self.format_url(url, opts)?;
        debug!(url = %url, signed = opts.is_signed(), "ospry download");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::Http {
                status: status.as_u16(),
                message: "download resulted in non-200 status".into(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

/// Decode a `{metadata, error}` response body.
///
/// An error envelope wins over the HTTP status. An empty body is accepted
/// for successful responses.
fn decode_envelope(status: u16, body: &[u8]) -> Result<Envelope, Error> {
    let success = (200..300).contains(&status);

    if success && body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Envelope::default());
    }

    match serde_json::from_slice::<Envelope>(body) {
        Ok(Envelope {
            error: Some(api), ..
        }) => {
            warn!(status = api.http_status_code, cause = %api.cause, "ospry API error");
            Err(Error::Api {
                status: if api.http_status_code == 0 {
                    status
                } else {
                    api.http_status_code
                },
                cause: api.cause,
                message: api.message,
            })
        }
        _ if !success => Err(Error::Http {
            status,
            message: String::from_utf8_lossy(body).into_owned(),
        }),
        Ok(envelope) => Ok(envelope),
        Err(e) => Err(Error::Deserialization(e.to_string())),
    }
}

fn require_metadata(envelope: Envelope) -> Result<Metadata, Error> {
    envelope
        .metadata
        .ok_or_else(|| Error::Deserialization("response did not include metadata".into()))
}
