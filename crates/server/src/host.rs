//! The remote image host as seen by the request handlers.

use async_trait::async_trait;
use bytes::Bytes;
use ospry_client::{Error, Metadata, OspryClient, RenderOpts};

/// Operations the demo needs from the image-hosting service.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload a private image.
    async fn upload_private(&self, filename: &str, data: Bytes) -> Result<Metadata, Error>;

    /// Delete an image.
    async fn delete(&self, id: &str) -> Result<(), Error>;

    /// Change an image's visibility.
    async fn set_private(&self, id: &str, is_private: bool) -> Result<Metadata, Error>;

    /// Claim an image uploaded from the browser.
    async fn claim(&self, id: &str) -> Result<Metadata, Error>;

    /// Build a rendered or signed URL for an image.
    fn format_url(&self, url: &str, opts: &RenderOpts) -> Result<String, Error>;
}

#[async_trait]
impl ImageHost for OspryClient {
    async fn upload_private(&self, filename: &str, data: Bytes) -> Result<Metadata, Error> {
        OspryClient::upload_private(self, filename, data).await
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        OspryClient::delete(self, id).await
    }

    async fn set_private(&self, id: &str, is_private: bool) -> Result<Metadata, Error> {
        OspryClient::set_private(self, id, is_private).await
    }

    async fn claim(&self, id: &str) -> Result<Metadata, Error> {
        OspryClient::claim(self, id).await
    }

    fn format_url(&self, url: &str, opts: &RenderOpts) -> Result<String, Error> {
        OspryClient::format_url(self, url, opts)
    }
}
