//! Runtime configuration and fixed constants
//!
//! Client settings come from CLI flags (see `cli`), proxy settings from the
//! environment so the upstream API key never appears on a command line.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::RateCache;
use crate::convert::SwapMode;

/// Proxy endpoint the client reads from by default
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/tipo-cambio";

/// Name of the single persisted cache entry
pub const CACHE_KEY: &str = "dolarlempira_cache";

/// How long a cached rate counts as fresh
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Upper bound on a single rate fetch, proxy and upstream alike
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between scheduled reloads
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1800);

/// How long the "last known rate" advisory stays visible
pub const ADVISORY_DISPLAY: Duration = Duration::from_secs(5);

/// Amount the converter starts with once a rate is known
pub const INITIAL_USD_AMOUNT: f64 = 100.0;

/// Upstream indicator endpoint (Banco Central de Honduras, indicator 97)
pub const DEFAULT_UPSTREAM_URL: &str =
    "https://bchapi-am.azure-api.net/api/v1/indicadores/97/cifras";

/// Address the proxy listens on by default
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Settings for the client side (TUI and `show`)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Proxy endpoint URL
    pub endpoint: String,
    /// Directory for the rate cache and the TUI log file
    pub cache_dir: PathBuf,
    /// Fetch timeout
    pub fetch_timeout: Duration,
    /// Interval between scheduled reloads
    pub refresh_interval: Duration,
    /// Swap semantics for the converter
    pub swap_mode: SwapMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_dir: default_cache_dir(),
            fetch_timeout: FETCH_TIMEOUT,
            refresh_interval: REFRESH_INTERVAL,
            swap_mode: SwapMode::default(),
        }
    }
}

/// XDG cache directory, or a directory under the OS temp dir when there is no home
pub fn default_cache_dir() -> PathBuf {
    RateCache::default_dir().unwrap_or_else(|| env::temp_dir().join("dolarlempira"))
}

/// Settings for the proxy endpoint
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Upstream indicator API URL
    pub upstream_url: String,
    /// Subscription key for the upstream API; requests fail with 500 when unset
    pub api_key: Option<String>,
    /// Upstream request timeout
    pub timeout: Duration,
    /// Listen address
    pub bind: String,
    /// Include internal error messages in error responses
    pub expose_details: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            api_key: None,
            timeout: FETCH_TIMEOUT,
            bind: DEFAULT_BIND.to_string(),
            expose_details: true,
        }
    }
}

impl ProxyConfig {
    /// Reads `BCH_API_KEY`, `BCH_API_URL` and `DOLARLEMPIRA_ENV` from the environment
    pub fn from_env() -> Self {
        let api_key = env::var("BCH_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let upstream_url =
            env::var("BCH_API_URL").unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string());
        let production = env::var("DOLARLEMPIRA_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Self {
            upstream_url,
            api_key,
            expose_details: !production,
            ..Self::default()
        }
    }

    /// Sets the listen address
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }
}
