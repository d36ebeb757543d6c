//! Service endpoint configuration.
//!
//! # Design
//! The endpoint is an immutable value handed to `RewriteClient::new`. There
//! is no global default client: two clients pointed at different services
//! can live in the same process.

use std::env;
use std::time::Duration;

/// Base address used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Rewriting is slow and may queue server-side, so the window is minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Environment variable overriding the base address.
pub const BASE_URL_ENV: &str = "REWRITE_API_BASE";

/// Environment variable overriding the timeout, in whole seconds.
pub const TIMEOUT_SECS_ENV: &str = "REWRITE_TIMEOUT_SECS";

/// Where the rewriting service lives and how long any one call may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    base_url: String,
    timeout: Duration,
}

impl ServiceEndpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Read `REWRITE_API_BASE` and `REWRITE_TIMEOUT_SECS`, falling back to
    /// the defaults for anything absent or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(BASE_URL_ENV)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = lookup(TIMEOUT_SECS_ENV)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self::new(base_url.trim(), timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for an operation path such as `/api/rewrite`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }
}
