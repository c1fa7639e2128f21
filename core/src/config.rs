//! Client configuration and provider-level credential resolution.

use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://localskills.sh";
pub const DEFAULT_USER_AGENT: &str = "terraform-provider-localskills";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const BASE_URL_ENV: &str = "LOCALSKILLS_BASE_URL";
pub const API_TOKEN_ENV: &str = "LOCALSKILLS_API_TOKEN";

const TOKEN_PREFIX: &str = "lsk_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "missing API token: set api_token in the provider configuration or the LOCALSKILLS_API_TOKEN environment variable"
    )]
    MissingToken,

    #[error("invalid API token: the token must start with 'lsk_'")]
    InvalidToken,
}

/// Immutable settings shared by every request of one client.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Base URL is used verbatim; paths are appended to it.
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolves settings from the environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(None, None)
    }

    /// Explicit provider settings win over `LOCALSKILLS_BASE_URL` and
    /// `LOCALSKILLS_API_TOKEN`; the base URL falls back to the public API.
    pub fn resolve(base_url: Option<&str>, api_token: Option<&str>) -> Result<Self, ConfigError> {
        resolve_with(base_url, api_token, |key| std::env::var(key).ok())
    }
}

// Hand-written so the token never ends up in logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

fn resolve_with(
    base_url: Option<&str>,
    api_token: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig, ConfigError> {
    let base_url = match base_url {
        Some(url) => url.to_string(),
        None => lookup(BASE_URL_ENV)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
    };

    let api_token = match api_token {
        Some(token) => token.to_string(),
        None => lookup(API_TOKEN_ENV).unwrap_or_default(),
    };

    if api_token.is_empty() {
        return Err(ConfigError::MissingToken);
    }
    if !api_token.starts_with(TOKEN_PREFIX) {
        return Err(ConfigError::InvalidToken);
    }

    Ok(ClientConfig::new(base_url, api_token))
}
