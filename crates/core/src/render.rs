use chrono::{DateTime, Utc};

use crate::metadata::ImageFormat;

/// Rendering options applied to an image URL.
///
/// Every field is optional; `None` means "not set". An explicitly set
/// dimension of `0` means "no constraint" and, unlike `None`, stops the value
/// from being inherited from a URL's query string. Setting `time_expired`
/// turns the formatted URL into a signed, time-limited one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOpts {
    /// Output format override.
    pub format: Option<ImageFormat>,
    /// Maximum height in pixels.
    pub max_height: Option<i64>,
    /// Maximum width in pixels.
    pub max_width: Option<i64>,
    /// Expiration instant of a signed URL.
    pub time_expired: Option<DateTime<Utc>>,
}

impl RenderOpts {
    /// Create an empty set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the maximum height.
    #[must_use]
    pub fn with_max_height(mut self, max_height: i64) -> Self {
        self.max_height = Some(max_height);
        self
    }

    /// Set the maximum width.
    #[must_use]
    pub fn with_max_width(mut self, max_width: i64) -> Self {
        self.max_width = Some(max_width);
        self
    }

    /// Set the expiration time, requesting a signed URL.
    #[must_use]
    pub fn with_time_expired(mut self, time_expired: DateTime<Utc>) -> Self {
        self.time_expired = Some(time_expired);
        self
    }

    /// Returns `true` if a formatted URL with these options will be signed.
    pub fn is_signed(&self) -> bool {
        self.time_expired.is_some()
    }

    /// Returns `true` if no option is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
