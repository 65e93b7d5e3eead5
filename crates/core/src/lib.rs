//! Core types and URL handling for the Ospry image-hosting API.
//!
//! Everything in this crate is pure and synchronous: image metadata types,
//! render options, and the normalization, signing and building of rendered
//! image URLs. The HTTP transport lives in `ospry-client`.
//!
//! ```
//! use ospry_core::{ImageFormat, RenderOpts, UrlFormatter};
//!
//! let formatter = UrlFormatter::new("sk-test-secret");
//! let url = formatter
//!     .format_url(
//!         "http://foo.ospry.io/bar/baz.png",
//!         &RenderOpts::new().with_format(ImageFormat::Gif).with_max_height(120),
//!     )
//!     .unwrap();
//! assert_eq!(url, "http://foo.ospry.io/bar/baz.png?format=gif&maxHeight=120");
//! ```

pub mod error;
pub mod format;
pub mod metadata;
pub mod query;
pub mod render;
pub mod signing;
pub mod timefmt;

pub use error::FormatError;
pub use format::{DEFAULT_API_HOST, Normalized, UrlFormatter, build, normalize};
pub use metadata::{ApiError, Envelope, ImageFormat, Metadata};
pub use render::RenderOpts;
