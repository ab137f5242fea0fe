//! Client configuration: API key and base URI.

use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://workflowy.com/api/v1";
pub const API_KEY_ENV: &str = "WORKFLOWY_API_KEY";
pub const BASE_URL_ENV: &str = "WORKFLOWY_BASE_URL";

#[derive(Clone)]
pub struct ClientConfig {
    api_key: String,
    base_url: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at another deployment, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Read `WORKFLOWY_API_KEY` and, if set, `WORKFLOWY_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))?;
        let config = Self::new(api_key.trim());
        Ok(match lookup(BASE_URL_ENV).filter(|url| !url.is_empty()) {
            Some(url) => config.with_base_url(&url),
            None => config,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set or empty")]
    MissingApiKey(&'static str),
}
