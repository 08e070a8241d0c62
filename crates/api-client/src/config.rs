//! Gateway and probe configuration.

use std::env;
use std::time::Duration;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Bound on the primary internet reachability probe.
pub const PROBE_PRIMARY_TIMEOUT_SECS: u64 = 5;

/// Bound on the fallback internet reachability probe.
pub const PROBE_FALLBACK_TIMEOUT_SECS: u64 = 3;

/// Bound on the backend health probe.
pub const HEALTH_PROBE_TIMEOUT_SECS: u64 = 10;

const DEFAULT_PROBE_PRIMARY_URL: &str = "https://connectivitycheck.gstatic.com/generate_204";
const DEFAULT_PROBE_FALLBACK_URL: &str = "https://one.one.one.one/cdn-cgi/trace";

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub probe_primary_url: String,
    pub probe_fallback_url: String,
}

impl ApiClientConfig {
    /// Create a config for the given backend base URL
    /// (e.g. "https://api.platewise.app").
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            probe_primary_url: DEFAULT_PROBE_PRIMARY_URL.to_string(),
            probe_fallback_url: DEFAULT_PROBE_FALLBACK_URL.to_string(),
        }
    }

    /// Resolve the backend base URL from `PLATEWISE_API_URL`.
    pub fn from_env() -> Option<Self> {
        env::var("PLATEWISE_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|url| Self::new(&url))
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}
