//! Cache-aside read path in front of the upstream telemetry API.
//!
//! Every category goes through the same flow: compute the key, try the
//! cache, and on a miss call upstream through the circuit breaker with an
//! empty-list fallback, then write whatever came back with the category TTL.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::ports::{KeyValueCache, UpstreamSource, UpstreamSourceError};
use super::{
    CacheKeyScheme, CircuitBreaker, CircuitBreakerError, DataCategory, Error, FetchParams,
    RETRY_AFTER_DETAIL, SessionKey, TtlPolicy,
};

/// Where the records returned by a fetch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    /// Served from the cache without touching upstream.
    Cache,
    /// Fetched from upstream.
    Upstream,
    /// Upstream unavailable; the empty fallback was served.
    Fallback,
}

impl FetchSource {
    /// Value used for the `X-Cache` response header.
    pub const fn cache_header(self) -> &'static str {
        match self {
            Self::Cache => "hit",
            Self::Upstream => "miss",
            Self::Fallback => "fallback",
        }
    }
}

/// Records plus their provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// Raw upstream records.
    pub records: Vec<Value>,
    /// Provenance of `records`.
    pub source: FetchSource,
}

/// Failures that reach callers of the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The upstream call failed below the breaker threshold.
    #[error(transparent)]
    Upstream(#[from] UpstreamSourceError),
    /// Upstream answered 429 below the breaker threshold.
    #[error("upstream rate limited: {error}")]
    RateLimited {
        /// Upstream failure.
        error: UpstreamSourceError,
        /// Suggested client back-off.
        retry_after: Duration,
    },
    /// The breaker rejected the call and no fallback applied.
    #[error("circuit breaker {breaker} is open")]
    CircuitOpen {
        /// Breaker name.
        breaker: String,
        /// Time until the breaker admits a probe.
        retry_after: Duration,
    },
}

impl From<FetchError> for Error {
    fn from(value: FetchError) -> Self {
        match value {
            FetchError::Upstream(_) => {
                Error::service_unavailable("upstream telemetry API unavailable")
                    .with_details(json!({ "reason": "upstream_failure" }))
            }
            FetchError::RateLimited { retry_after, .. } => {
                Error::service_unavailable("upstream telemetry API is rate limiting requests")
                    .with_details(json!({
                        "reason": "rate_limited",
                        RETRY_AFTER_DETAIL: whole_seconds(retry_after),
                    }))
            }
            FetchError::CircuitOpen {
                breaker,
                retry_after,
            } => Error::service_unavailable("upstream telemetry API temporarily disabled")
                .with_details(json!({
                    "reason": "circuit_open",
                    "breaker": breaker,
                    RETRY_AFTER_DETAIL: whole_seconds(retry_after),
                })),
        }
    }
}

/// Seconds rounded up, never below one.
fn whole_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    let rounded = if duration.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    };
    rounded.max(1)
}

/// Cache value standing in for an empty fallback, so later reads still
/// report [`FetchSource::Fallback`].
const FALLBACK_ENTRY: &str = r#"{"fallback":true}"#;

/// Cache-aside proxy composing the upstream source, the cache and a breaker.
pub struct ResilientFetchProxy {
    source: Arc<dyn UpstreamSource>,
    cache: Arc<dyn KeyValueCache>,
    breaker: Arc<CircuitBreaker>,
    keys: CacheKeyScheme,
    ttl: TtlPolicy,
}

impl ResilientFetchProxy {
    /// Build a proxy with the default key scheme and TTL table.
    pub fn new(
        source: Arc<dyn UpstreamSource>,
        cache: Arc<dyn KeyValueCache>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            source,
            cache,
            breaker,
            keys: CacheKeyScheme::default(),
            ttl: TtlPolicy::default(),
        }
    }

    /// Replace the key scheme (namespace).
    #[must_use]
    pub fn with_key_scheme(mut self, keys: CacheKeyScheme) -> Self {
        self.keys = keys;
        self
    }

    /// Replace the TTL table.
    #[must_use]
    pub fn with_ttl_policy(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    /// Breaker guarding the upstream source.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Whether the cache backend is accepting operations.
    pub fn cache_ready(&self) -> bool {
        self.cache.is_ready()
    }

    /// Key scheme used for reads, writes and invalidation.
    pub fn key_scheme(&self) -> &CacheKeyScheme {
        &self.keys
    }

    /// Fetch records for `category`, serving from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when upstream fails below the breaker threshold.
    pub async fn fetch(
        &self,
        category: DataCategory,
        params: &FetchParams,
    ) -> Result<Vec<Value>, FetchError> {
        self.fetch_with_status(category, params)
            .await
            .map(|outcome| outcome.records)
    }

    /// Like [`Self::fetch`] but also reports where the records came from.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when upstream fails below the breaker threshold.
    pub async fn fetch_with_status(
        &self,
        category: DataCategory,
        params: &FetchParams,
    ) -> Result<FetchOutcome, FetchError> {
        let key = self.keys.key_for(category, params);

        if let Some(outcome) = self.read_cached(category, key.as_str()).await {
            debug!(%category, cache_key = %key, source = outcome.source.cache_header(), "cache hit");
            return Ok(outcome);
        }
        debug!(%category, cache_key = %key, "cache miss");

        let (source, records) = self
            .breaker
            .execute(
                || async {
                    self.source
                        .fetch(category, params)
                        .await
                        .map(|records| (FetchSource::Upstream, records))
                },
                Some((FetchSource::Fallback, Vec::new())),
            )
            .await
            .map_err(|error| self.fetch_error(error))?;

        if source == FetchSource::Fallback {
            warn!(%category, cache_key = %key, breaker = %self.breaker.name(), "serving empty fallback");
        }
        self.write_cached(category, key.as_str(), source, &records).await;
        Ok(FetchOutcome { records, source })
    }

    fn fetch_error(&self, error: CircuitBreakerError<UpstreamSourceError>) -> FetchError {
        match error {
            CircuitBreakerError::Open {
                breaker,
                retry_after,
            } => FetchError::CircuitOpen {
                breaker,
                retry_after,
            },
            CircuitBreakerError::Failed(error) if error.is_rate_limited() => {
                FetchError::RateLimited {
                    error,
                    retry_after: self.breaker.config().recovery_timeout,
                }
            }
            CircuitBreakerError::Failed(error) => FetchError::Upstream(error),
        }
    }

    /// Drop every cached entry for `session_key`.
    pub async fn invalidate_session(&self, session_key: SessionKey) {
        let prefix = self.keys.session_prefix(session_key);
        debug!(%session_key, prefix = %prefix, "invalidating session cache");
        self.cache.delete_prefix(&prefix).await;
    }

    /// Drop cached entries for one category of `session_key`.
    pub async fn invalidate_category(&self, session_key: SessionKey, category: DataCategory) {
        let prefix = self.keys.category_prefix(session_key, category);
        debug!(%session_key, %category, prefix = %prefix, "invalidating category cache");
        self.cache.delete_prefix(&prefix).await;
    }

    async fn read_cached(&self, category: DataCategory, key: &str) -> Option<FetchOutcome> {
        let raw = self.cache.get(key).await?;
        if raw == FALLBACK_ENTRY {
            return Some(FetchOutcome {
                records: Vec::new(),
                source: FetchSource::Fallback,
            });
        }
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(records) => Some(FetchOutcome {
                records,
                source: FetchSource::Cache,
            }),
            Err(error) => {
                warn!(%category, cache_key = key, %error, "discarding undecodable cache entry");
                self.cache.delete(key).await;
                None
            }
        }
    }

    async fn write_cached(
        &self,
        category: DataCategory,
        key: &str,
        source: FetchSource,
        records: &[Value],
    ) {
        let serialised = if source == FetchSource::Fallback {
            FALLBACK_ENTRY.to_owned()
        } else {
            match serde_json::to_string(records) {
                Ok(serialised) => serialised,
                Err(error) => {
                    warn!(%category, cache_key = key, %error, "failed to serialise records for cache");
                    return;
                }
            }
        };
        self.cache
            .set(key, &serialised, self.ttl.ttl_for(category))
            .await;
    }
}

#[cfg(test)]
mod tests;
