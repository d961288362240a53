//! Configuration management for Tenantgate.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `TENANTGATE_*` environment variables (sections separated by `__`, e.g.
//! `TENANTGATE_RATE_LIMITING__MAX_REQUESTS=50`).

use std::net::SocketAddr;
use std::path::Path;

use axum::http::HeaderName;
use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};
use crate::ratelimit::{RateLimitPolicy, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS};

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "TENANTGATE";

/// Main configuration for the Tenantgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Sliding window length in milliseconds
    #[serde(default = "default_window_duration_ms")]
    pub window_duration_ms: u64,

    /// Admitted requests per tenant per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Request header carrying the tenant identifier
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,

    /// How often to evict idle tenants; `None` keeps every tenant forever
    #[serde(default)]
    pub eviction_interval_secs: Option<u64>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            window_duration_ms: default_window_duration_ms(),
            max_requests: default_max_requests(),
            tenant_header: default_tenant_header(),
            eviction_interval_secs: None,
        }
    }
}

fn default_window_duration_ms() -> u64 {
    DEFAULT_WINDOW_MS
}

fn default_max_requests() -> u64 {
    DEFAULT_MAX_REQUESTS
}

fn default_tenant_header() -> String {
    "x-tenant-id".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GateConfig {
    /// Load configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`GateConfig::load`], reading variables from `env` instead of
    /// the process environment when it is given.
    fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: GateConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be turned into a running limiter.
    pub fn validate(&self) -> Result<()> {
        self.policy()?;
        self.tenant_header()?;
        if self.rate_limiting.eviction_interval_secs == Some(0) {
            return Err(GateError::Config(
                "eviction_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The rate limit policy described by this configuration.
    pub fn policy(&self) -> Result<RateLimitPolicy> {
        RateLimitPolicy::new(
            self.rate_limiting.window_duration_ms,
            self.rate_limiting.max_requests,
        )
    }

    /// The tenant header as a validated header name.
    pub fn tenant_header(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.rate_limiting.tenant_header.as_bytes()).map_err(|e| {
            GateError::Config(format!(
                "invalid tenant_header '{}': {}",
                self.rate_limiting.tenant_header, e
            ))
        })
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| GateError::Config(e.to_string()))
    }
}
