//! HMAC-SHA256 signatures for time-limited image URLs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::FormatError;
use crate::query;
use crate::timefmt::format_rfc3339_nano;

type HmacSha256 = Hmac<Sha256>;

/// Compute the raw HMAC-SHA256 digest of `payload` keyed by `secret_key`.
pub fn sign(secret_key: &[u8], payload: &str) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(secret_key).expect("HMAC accepts any key size");
    mac.update(payload.as_bytes());
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}

/// Build the canonical string that is signed for an underlying image URL.
///
/// Format: `<underlying-url>?timeExpired=<escaped RFC 3339 UTC time>`.
pub fn signing_payload(underlying_url: &str, time_expired: DateTime<Utc>) -> String {
    format!(
        "{underlying_url}?timeExpired={}",
        query::escape(&format_rfc3339_nano(time_expired))
    )
}

/// Render a digest as padded standard base64.
pub fn encode_signature(digest: &[u8]) -> String {
    STANDARD.encode(digest)
}

/// Check a base64 signature against `payload` in constant time.
pub fn verify(secret_key: &[u8], payload: &str, signature: &str) -> Result<(), FormatError> {
    let raw = STANDARD
        .decode(signature)
        .map_err(|_| FormatError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(secret_key).expect("HMAC accepts any key size");
    mac.update(payload.as_bytes());
    mac.verify_slice(&raw)
        .map_err(|_| FormatError::InvalidSignature)
}
