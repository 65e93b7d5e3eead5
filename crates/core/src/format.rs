//! Render-option normalization and rendered/signed URL construction.
//!
//! [`normalize`] accepts either a plain image URL or a URL previously built
//! by [`build`] and recovers the underlying image URL together with the
//! effective options. [`build`] turns that back into a rendered URL, or into
//! a signed URL rehosted on the API host when an expiration time is set.
//! Feeding a built URL back through [`normalize`] yields the same options and
//! underlying URL.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::FormatError;
use crate::query::{self, QueryParams};
use crate::render::RenderOpts;
use crate::signing;
use crate::timefmt::{format_rfc3339_nano, parse_rfc3339};

/// Host that serves signed URLs.
pub const DEFAULT_API_HOST: &str = "api.ospry.io";

const PARAM_FORMAT: &str = "format";
const PARAM_MAX_HEIGHT: &str = "maxHeight";
const PARAM_MAX_WIDTH: &str = "maxWidth";
const PARAM_SIGNATURE: &str = "signature";
const PARAM_TIME_EXPIRED: &str = "timeExpired";
const PARAM_URL: &str = "url";

/// The result of normalizing an image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Effective options: caller values, gaps filled from the URL's query.
    pub opts: RenderOpts,
    /// The option-free location of the image.
    pub underlying: Url,
    /// Signature carried by the input URL, if it was a signed URL.
    pub signature: Option<String>,
}

/// Resolve the effective render options and underlying image URL.
///
/// Options set in `caller` always win; options embedded in `raw_url`'s query
/// only fill the gaps. If the query carries a `url` parameter, `raw_url` is a
/// previously built URL and that parameter names the underlying image.
/// `caller` is never modified. Only absolute URLs are accepted; a relative
/// reference fails with [`FormatError::InvalidUrl`].
pub fn normalize(raw_url: &str, caller: &RenderOpts) -> Result<Normalized, FormatError> {
    let mut url = Url::parse(raw_url)?;
    let params = url.query().map(QueryParams::parse).unwrap_or_default();
    let mut opts = caller.clone();

    // Checked only once every parameter has parsed, so malformed input wins.
    let query_format = params.get(PARAM_FORMAT).filter(|_| opts.format.is_none());
    if opts.max_width.is_none()
        && let Some(v) = params.get(PARAM_MAX_WIDTH)
    {
        opts.max_width = Some(parse_dimension(PARAM_MAX_WIDTH, v)?);
    }
    if opts.max_height.is_none()
        && let Some(v) = params.get(PARAM_MAX_HEIGHT)
    {
        opts.max_height = Some(parse_dimension(PARAM_MAX_HEIGHT, v)?);
    }
    if opts.time_expired.is_none()
        && let Some(v) = params.get(PARAM_TIME_EXPIRED)
    {
        opts.time_expired = Some(parse_rfc3339(v).map_err(|e| FormatError::InvalidParam {
            name: PARAM_TIME_EXPIRED,
            value: v.to_owned(),
            reason: e.to_string(),
        })?);
    }

    let underlying = match params.get(PARAM_URL) {
        Some(inner) => Url::parse(inner)?,
        None => {
            url.set_query(None);
            url
        }
    };

    if let Some(v) = query_format {
        opts.format = Some(v.parse()?);
    }
    validate_dimension(PARAM_MAX_HEIGHT, opts.max_height)?;
    validate_dimension(PARAM_MAX_WIDTH, opts.max_width)?;

    // Zero means "no constraint" and is never written back into a URL.
    opts.max_height = opts.max_height.filter(|h| *h != 0);
    opts.max_width = opts.max_width.filter(|w| *w != 0);

    Ok(Normalized {
        opts,
        underlying,
        signature: params.get(PARAM_SIGNATURE).map(str::to_owned),
    })
}

/// Assemble the final URL for a normalized image.
///
/// Without an expiration time the result is the underlying URL with its
/// query replaced by the render options. With one, the URL is signed with
/// `secret_key` and rehosted on `https://<api_host>/`. Query keys are always
/// emitted in lexicographic order.
pub fn build(
    normalized: &Normalized,
    secret_key: &[u8],
    api_host: &str,
) -> Result<String, FormatError> {
    let opts = &normalized.opts;
    let mut params: BTreeMap<&str, String> = BTreeMap::new();

    let mut out = if let Some(expires) = opts.time_expired {
        let underlying = normalized.underlying.as_str();
        let payload = signing::signing_payload(underlying, expires);
        let digest = signing::sign(secret_key, &payload);
        params.insert(PARAM_SIGNATURE, signing::encode_signature(&digest));
        params.insert(PARAM_TIME_EXPIRED, format_rfc3339_nano(expires));
        params.insert(PARAM_URL, underlying.to_owned());
        Url::parse(&format!("https://{api_host}/"))?
    } else {
        normalized.underlying.clone()
    };

    if let Some(format) = opts.format {
        params.insert(PARAM_FORMAT, format.as_str().to_owned());
    }
    if let Some(h) = opts.max_height.filter(|h| *h > 0) {
        params.insert(PARAM_MAX_HEIGHT, h.to_string());
    }
    if let Some(w) = opts.max_width.filter(|w| *w > 0) {
        params.insert(PARAM_MAX_WIDTH, w.to_string());
    }

    let encoded = query::encode(&params);
    out.set_query((!encoded.is_empty()).then_some(encoded.as_str()));
    Ok(out.into())
}

fn parse_dimension(name: &'static str, value: &str) -> Result<i64, FormatError> {
    value
        .parse::<i64>()
        .map_err(|e| FormatError::InvalidParam {
            name,
            value: value.to_owned(),
            reason: e.to_string(),
        })
}

fn validate_dimension(name: &str, value: Option<i64>) -> Result<(), FormatError> {
    match value {
        Some(v) if v < 0 => Err(FormatError::Validation(format!(
            "{name} can't be negative"
        ))),
        _ => Ok(()),
    }
}

/// Formats and verifies image URLs with a fixed secret key.
///
/// Holds no mutable state and can be shared freely across threads.
#[derive(Clone)]
pub struct UrlFormatter {
    secret_key: Vec<u8>,
    api_host: String,
}

impl fmt::Debug for UrlFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlFormatter")
            .field("secret_key", &"<redacted>")
            .field("api_host", &self.api_host)
            .finish()
    }
}

impl UrlFormatter {
    /// Create a formatter that signs with `secret_key`.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            api_host: DEFAULT_API_HOST.to_owned(),
        }
    }

    /// Override the host that serves signed URLs.
    #[must_use]
    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    /// The host signed URLs are rehosted on.
    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// Produce a rendered (and, if `opts.time_expired` is set, signed) URL.
    ///
    /// `raw_url` must be absolute and may itself be a rendered or signed URL;
    /// its embedded options fill whatever `opts` leaves unset.
    pub fn format_url(&self, raw_url: &str, opts: &RenderOpts) -> Result<String, FormatError> {
        let normalized = normalize(raw_url, opts)?;
        build(&normalized, &self.secret_key, &self.api_host)
    }

    /// Check that `signed_url` carries a valid signature and has not expired
    /// at `now`. Returns the normalized view of the URL on success.
    pub fn verify_url(
        &self,
        signed_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Normalized, FormatError> {
        let normalized = normalize(signed_url, &RenderOpts::default())?;
        let (Some(signature), Some(expires)) =
            (normalized.signature.as_deref(), normalized.opts.time_expired)
        else {
            return Err(FormatError::MissingSignature);
        };

        let payload = signing::signing_payload(normalized.underlying.as_str(), expires);
        signing::verify(&self.secret_key, &payload, signature)?;

        if now >= expires {
            return Err(FormatError::Expired {
                expired_at: expires,
            });
        }
        Ok(normalized)
    }
}
