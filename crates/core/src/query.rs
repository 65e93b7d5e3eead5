//! Query-string encoding compatible with the remote service.
//!
//! Components are escaped the way HTML form values are: ASCII alphanumerics
//! and `-_.~` are kept, a space becomes `+`, everything else is `%XX`.
//! Encoded parameter lists are always ordered by key.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escape a string for use as a query key or value.
pub fn escape(s: &str) -> String {
    // A literal '%' is always encoded, so "%20" can only come from a space.
    utf8_percent_encode(s, QUERY_COMPONENT)
        .to_string()
        .replace("%20", "+")
}

/// Reverse [`escape`]. Invalid UTF-8 sequences are replaced.
pub fn unescape(s: &str) -> String {
    percent_decode_str(&s.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Decoded query parameters, in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw query string (without the leading `?`).
    pub fn parse(raw: &str) -> Self {
        let pairs = raw
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((k, v)) => (unescape(k), unescape(v)),
                None => (unescape(part), String::new()),
            })
            .collect();
        Self { pairs }
    }

    /// First non-empty value for `key`.
    ///
    /// An empty value is treated the same as an absent parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

/// Encode parameters as `k=v&...` with keys in lexicographic order.
pub fn encode(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}
