//! Demo server configuration, loaded from a TOML file.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file,
//! `OSPRY_SECRET_KEY` / `OSPRY_PUBLIC_KEY`, command-line flags.


use std::path::Path;
use std::time::Duration;

use ospry_client::{DEFAULT_API_HOST, DEFAULT_SERVER_URL, OspryClient};
use serde::Deserialize;

use crate::error::DemoError;

/// Environment variable holding the secret API key.
pub const SECRET_KEY_ENV: &str = "OSPRY_SECRET_KEY";
/// Environment variable holding the public API key.
pub const PUBLIC_KEY_ENV: &str = "OSPRY_PUBLIC_KEY";

/// Top-level configuration for the demo server.
#[derive(Debug, Default, Deserialize)]
pub struct DemoConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Image host credentials and client settings.
    #[serde(default)]
    pub ospry: OspryConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server bind configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    8080
}

/// Image host settings.
///
/// # Example
///
/// ```toml
/// [ospry]
/// secret_key = "sk-..."
/// public_key = "pk-..."
/// signed_url_ttl_seconds = 60
/// ```
#[derive(Debug, Deserialize)]
pub struct OspryConfig {
    /// Secret key used for API calls and URL signing.
    pub secret_key: Option<String>,
    /// Public key handed to the browser uploader.
    pub public_key: Option<String>,
    /// API endpoint.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Host that serves signed URLs.
    #[serde(default = "default_api_host")]
    pub api_host: String,
    /// Lifetime of the signed URLs embedded in the page.
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_seconds: u64,
    /// Request timeout for API calls.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OspryConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            public_key: None,
            server_url: default_server_url(),
            api_host: default_api_host(),
            signed_url_ttl_seconds: default_signed_url_ttl(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_owned()
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_owned()
}

fn default_signed_url_ttl() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

/// Log output format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Log output configuration. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl DemoConfig {
    /// Load configuration from `path`, or use defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, DemoError> {
        if !path.exists() {
            return Self::parse("");
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, DemoError> {
        toml::from_str(contents).map_err(|e| DemoError::Config(e.to_string()))
    }

    /// Override the keys from environment variables resolved by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(SECRET_KEY_ENV).filter(|k| !k.is_empty()) {
            self.ospry.secret_key = Some(key);
        }
        if let Some(key) = lookup(PUBLIC_KEY_ENV).filter(|k| !k.is_empty()) {
            self.ospry.public_key = Some(key);
        }
    }
}

impl OspryConfig {
    /// The secret and public keys. Both are required.
    pub fn keys(&self) -> Result<(&str, &str), DemoError> {
        let secret = self
            .secret_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DemoError::Config("ospry.secret_key is required".into()))?;
        let public = self
            .public_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DemoError::Config("ospry.public_key is required".into()))?;
        Ok((secret, public))
    }

    /// Lifetime of signed URLs as a signed duration.
    pub fn signed_url_ttl(&self) -> Result<chrono::Duration, DemoError> {
        i64::try_from(self.signed_url_ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                DemoError::Config(format!(
                    "ospry.signed_url_ttl_seconds out of range: {}",
                    self.signed_url_ttl_seconds
                ))
            })
    }

    /// Build a client from these settings.
    pub fn client(&self) -> Result<OspryClient, DemoError> {
        let (secret, _) = self.keys()?;
        Ok(OspryClient::builder(secret)
            .server_url(&self.server_url)
            .api_host(&self.api_host)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .build()?)
    }
}
