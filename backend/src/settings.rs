//! Gateway configuration loaded via OrthoConfig.
//!
//! Every value is optional on the wire; accessors supply the defaults and
//! validate the raw strings into typed values.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::{
    CacheKeyScheme, CacheKeyValidationError, CircuitBreakerConfig, DataCategory, TtlPolicy,
    TtlPolicyError, UnknownCategoryError,
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.openf1.org/v1/";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REDIS_POOL_SIZE: u32 = 8;
const DEFAULT_REDIS_HEALTH_INTERVAL_SECS: u64 = 5;
const DEFAULT_TTL_JITTER_RATIO: f64 = 0.1;

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The bind address is not a socket address.
    #[error("invalid bind address {value:?}: {source}")]
    BindAddr {
        /// Configured value.
        value: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },
    /// The upstream base URL does not parse.
    #[error("invalid upstream base URL {value:?}: {source}")]
    UpstreamUrl {
        /// Configured value.
        value: String,
        /// Parse failure.
        source: url::ParseError,
    },
    /// The cache namespace is blank or malformed.
    #[error("invalid cache namespace: {0}")]
    Namespace(#[from] CacheKeyValidationError),
    /// A TTL override entry is invalid.
    #[error("invalid TTL overrides: {0}")]
    TtlOverrides(#[from] TtlPolicyError),
    /// The preload list names an unknown category.
    #[error("invalid preload category list: {0}")]
    PreloadCategories(#[from] UnknownCategoryError),
}

/// Configuration for the telemetry gateway.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PADDOCK")]
pub struct GatewaySettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Root URL of the upstream telemetry API.
    pub upstream_base_url: Option<String>,
    /// Upstream request timeout in seconds.
    pub upstream_timeout_secs: Option<u64>,
    /// User-agent sent upstream.
    pub user_agent: Option<String>,
    /// Consecutive failures before the breaker opens.
    pub breaker_failure_threshold: Option<u32>,
    /// Seconds after the last failure before a probe is admitted.
    pub breaker_recovery_secs: Option<u64>,
    /// Redis connection URL; the in-memory cache is used when absent.
    pub redis_url: Option<String>,
    /// Maximum pooled Redis connections.
    pub redis_pool_size: Option<u32>,
    /// Seconds between Redis health checks.
    pub redis_health_interval_secs: Option<u64>,
    /// Cache key namespace.
    pub cache_namespace: Option<String>,
    /// Per-category TTL overrides, e.g. `laps=60,intervals=10`.
    pub ttl_overrides: Option<String>,
    /// Fraction of each TTL added as random jitter on Redis writes.
    pub ttl_jitter_ratio: Option<f64>,
    /// Comma-separated categories warmed by a preload.
    pub preload_categories: Option<String>,
}

impl GatewaySettings {
    /// Parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|source| SettingsError::BindAddr {
            value: raw.to_owned(),
            source,
        })
    }

    /// Parsed upstream base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UpstreamUrl`] when the value is not a URL.
    pub fn upstream_base_url(&self) -> Result<Url, SettingsError> {
        let raw = self
            .upstream_base_url
            .as_deref()
            .unwrap_or(DEFAULT_UPSTREAM_BASE_URL);
        Url::parse(raw).map_err(|source| SettingsError::UpstreamUrl {
            value: raw.to_owned(),
            source,
        })
    }

    /// User-agent override for upstream requests.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Per-request upstream deadline.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(
            self.upstream_timeout_secs
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        )
    }

    /// Breaker thresholds, falling back to the breaker defaults.
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        let defaults = CircuitBreakerConfig::default();
        CircuitBreakerConfig {
            failure_threshold: self
                .breaker_failure_threshold
                .unwrap_or(defaults.failure_threshold),
            recovery_timeout: self
                .breaker_recovery_secs
                .map_or(defaults.recovery_timeout, Duration::from_secs),
        }
    }

    /// Configured Redis URL, ignoring blank values.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Maximum pooled Redis connections.
    pub fn redis_pool_size(&self) -> u32 {
        self.redis_pool_size.unwrap_or(DEFAULT_REDIS_POOL_SIZE)
    }

    /// Interval between Redis `PING` checks.
    pub fn redis_health_interval(&self) -> Duration {
        Duration::from_secs(
            self.redis_health_interval_secs
                .unwrap_or(DEFAULT_REDIS_HEALTH_INTERVAL_SECS),
        )
    }

    /// Upper bound of the random TTL extension, as a fraction of the TTL.
    pub fn ttl_jitter_ratio(&self) -> f64 {
        self.ttl_jitter_ratio.unwrap_or(DEFAULT_TTL_JITTER_RATIO)
    }

    /// Key scheme for the configured namespace.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Namespace`] for blank or malformed namespaces.
    pub fn key_scheme(&self) -> Result<CacheKeyScheme, SettingsError> {
        match self.cache_namespace.as_deref() {
            Some(namespace) => Ok(CacheKeyScheme::new(namespace)?),
            None => Ok(CacheKeyScheme::default()),
        }
    }

    /// TTL table with any configured overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::TtlOverrides`] when an override is malformed.
    pub fn ttl_policy(&self) -> Result<TtlPolicy, SettingsError> {
        match self.ttl_overrides.as_deref() {
            Some(raw) => Ok(TtlPolicy::parse_overrides(raw)?),
            None => Ok(TtlPolicy::default()),
        }
    }

    /// Categories warmed by a preload; `None` keeps the default replay set.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::PreloadCategories`] for unknown names.
    pub fn preload_categories(&self) -> Result<Option<Vec<DataCategory>>, SettingsError> {
        let Some(raw) = self.preload_categories.as_deref() else {
            return Ok(None);
        };
        let categories = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<DataCategory>, _>>()?;
        Ok(Some(categories))
    }
}
