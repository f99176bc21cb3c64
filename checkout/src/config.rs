use std::time::Duration;

/// Production Payflow API.
pub const DEFAULT_API_URL: &str = "https://api.payflow.me";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const API_URL_ENV: &str = "PAYFLOW_API_URL";
pub const TIMEOUT_ENV: &str = "PAYFLOW_HTTP_TIMEOUT_SECS";
pub const ACCESS_TOKEN_ENV: &str = "PAYFLOW_ACCESS_TOKEN";

/// Settings for the HTTP backend client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    /// Bearer token for authenticated routes (payment updates, flow changes).
    pub access_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            access_token: None,
        }
    }
}

impl ClientConfig {
    /// Read overrides from the environment, falling back to defaults.
    /// Unparseable timeouts are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        config.access_token = lookup(ACCESS_TOKEN_ENV).filter(|t| !t.is_empty());
        config
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}
