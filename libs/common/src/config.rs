//! Client configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `BANDROOM_*` environment variables.

use std::path::Path;

use config::{Config, Environment, File};
use reqwest::{Url, header::HeaderName};
use serde::Deserialize;

use crate::error::{ClientError, ClientResult};

/// Default backend origin
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Cookie holding the anti-forgery token
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";
/// Header echoing the anti-forgery token on state-changing requests
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFToken";
/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "bandroom";

/// Configuration for the backend connection and the console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend origin (e.g. "http://localhost:8000")
    pub api_url: String,
    /// Name of the anti-forgery cookie
    pub csrf_cookie: String,
    /// Name of the header the anti-forgery token is echoed in
    pub csrf_header: String,
    /// Log filter used when RUST_LOG is unset
    pub log_level: String,
    /// Room reserved when none is given explicitly
    #[serde(default)]
    pub default_room: Option<String>,
}

impl ClientConfig {
    /// Create a new ClientConfig from environment variables only
    ///
    /// # Environment Variables
    /// - `BANDROOM_API_URL`: backend origin (default: "http://localhost:8000")
    /// - `BANDROOM_CSRF_COOKIE`: anti-forgery cookie name (default: "csrftoken")
    /// - `BANDROOM_CSRF_HEADER`: anti-forgery header name (default: "X-CSRFToken")
    /// - `BANDROOM_LOG_LEVEL`: log filter (default: "info")
    /// - `BANDROOM_DEFAULT_ROOM`: room id used for reservations (default: unset)
    pub fn from_env() -> ClientResult<Self> {
        let config = Self::build(None, false)?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults, then the config file, then the environment
    ///
    /// Without an explicit path, `bandroom.toml` in the working directory is
    /// used when it exists. An explicit path must exist. The result is not
    /// validated; call [`ClientConfig::validate`] once overrides are applied.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        Self::build(path, true)
    }

    fn build(path: Option<&Path>, with_file: bool) -> ClientResult<Self> {
        let mut builder = Config::builder()
            .set_default("api_url", DEFAULT_API_URL)
            .and_then(|b| b.set_default("csrf_cookie", DEFAULT_CSRF_COOKIE))
            .and_then(|b| b.set_default("csrf_header", DEFAULT_CSRF_HEADER))
            .and_then(|b| b.set_default("log_level", "info"))
            .map_err(configuration)?;

        if with_file {
            builder = match path {
                Some(path) => builder.add_source(File::from(path).required(true)),
                None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
            };
        }

        let config: ClientConfig = builder
            .add_source(Environment::with_prefix("BANDROOM"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(configuration)?;

        Ok(config)
    }

    /// Check that the URL and header name are usable
    pub fn validate(&self) -> ClientResult<()> {
        self.base_url()?;
        self.csrf_header_name()?;

        if self.csrf_cookie.trim().is_empty() {
            return Err(ClientError::Configuration(
                "csrf_cookie must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed backend origin
    pub fn base_url(&self) -> ClientResult<Url> {
        let url = Url::parse(&self.api_url).map_err(|e| {
            ClientError::Configuration(format!("Invalid api_url '{}': {}", self.api_url, e))
        })?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(format!(
                "api_url '{}' must be an http(s) origin",
                self.api_url
            )));
        }

        Ok(url)
    }

    /// Parsed anti-forgery header name
    pub fn csrf_header_name(&self) -> ClientResult<HeaderName> {
        HeaderName::from_bytes(self.csrf_header.as_bytes()).map_err(|e| {
            ClientError::Configuration(format!(
                "Invalid csrf_header '{}': {}",
                self.csrf_header, e
            ))
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            csrf_cookie: DEFAULT_CSRF_COOKIE.to_string(),
            csrf_header: DEFAULT_CSRF_HEADER.to_string(),
            log_level: "info".to_string(),
            default_room: None,
        }
    }
}

fn configuration(e: config::ConfigError) -> ClientError {
    ClientError::Configuration(e.to_string())
}
