//! Adapter selection and domain service wiring from configuration.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use paddock::domain::ports::{KeyValueCache, UpstreamSource};
use paddock::domain::{CircuitBreaker, PreloadOrchestrator, ResilientFetchProxy};
use paddock::inbound::http::state::HttpState;
use paddock::outbound::cache::{InMemoryKeyValueCache, RedisCacheConfig, RedisKeyValueCache};
use paddock::outbound::openf1::{OpenF1HttpConfig, OpenF1HttpSource};
use paddock::settings::GatewaySettings;

/// Breaker guarding the upstream telemetry API.
pub const UPSTREAM_BREAKER: &str = "openf1";

/// Wired services plus the handles the bootstrap must keep.
pub struct Gateway {
    pub http_state: HttpState,
    pub cache: Arc<dyn KeyValueCache>,
    /// Redis readiness monitor, when Redis is configured.
    pub health_monitor: Option<JoinHandle<()>>,
}

fn config_error(error: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("invalid configuration: {error}"))
}

async fn build_cache(
    settings: &GatewaySettings,
    clock: Arc<dyn Clock>,
) -> std::io::Result<(Arc<dyn KeyValueCache>, Option<JoinHandle<()>>)> {
    let Some(url) = settings.redis_url() else {
        info!("no Redis URL configured; using the in-memory cache");
        return Ok((Arc::new(InMemoryKeyValueCache::new(clock)), None));
    };

    let config = RedisCacheConfig::new(url)
        .with_pool_size(settings.redis_pool_size())
        .with_jitter_ratio(settings.ttl_jitter_ratio());
    let cache = Arc::new(RedisKeyValueCache::new(&config).map_err(config_error)?);
    if !cache.check_health().await {
        warn!(
            redis = %config.redacted_url(),
            "Redis unreachable at startup; serving uncached until it recovers"
        );
    }
    let monitor = cache.spawn_health_monitor(settings.redis_health_interval());
    Ok((cache, Some(monitor)))
}

fn build_upstream(settings: &GatewaySettings) -> std::io::Result<Arc<dyn UpstreamSource>> {
    let mut config = OpenF1HttpConfig::new(settings.upstream_base_url().map_err(config_error)?);
    config.timeout = settings.upstream_timeout();
    if let Some(user_agent) = settings.user_agent() {
        config.user_agent = user_agent.to_owned();
    }
    let source = OpenF1HttpSource::new(config)
        .map_err(|error| std::io::Error::other(format!("HTTP client setup failed: {error}")))?;
    Ok(Arc::new(source))
}

/// Build the cache, upstream source, breaker, proxy and orchestrator.
///
/// # Errors
/// Returns [`std::io::Error`] when a setting is invalid or an adapter cannot
/// be constructed.
pub async fn build_gateway(settings: &GatewaySettings) -> std::io::Result<Gateway> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let (cache, health_monitor) = build_cache(settings, clock.clone()).await?;
    let source = build_upstream(settings)?;
    let breaker = Arc::new(CircuitBreaker::new(
        UPSTREAM_BREAKER,
        settings.breaker_config(),
        clock,
    ));

    let proxy = Arc::new(
        ResilientFetchProxy::new(source, cache.clone(), breaker)
            .with_key_scheme(settings.key_scheme().map_err(config_error)?)
            .with_ttl_policy(settings.ttl_policy().map_err(config_error)?),
    );
    let mut preload = PreloadOrchestrator::new(proxy.clone());
    if let Some(categories) = settings.preload_categories().map_err(config_error)? {
        preload = preload.with_categories(categories);
    }

    Ok(Gateway {
        http_state: HttpState::new(proxy, Arc::new(preload)),
        cache,
        health_monitor,
    })
}
