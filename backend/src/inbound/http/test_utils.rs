//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::domain::ports::{KeyValueCache, UpstreamSource};
use crate::domain::{
    CircuitBreaker, CircuitBreakerConfig, PreloadOrchestrator, ResilientFetchProxy,
};
use crate::inbound::http::state::HttpState;
use crate::test_support::clock::MutableClock;

/// Breaker name used by [`http_state`].
pub const TEST_BREAKER: &str = "openf1";

/// Build handler state over the given adapters.
///
/// - The breaker trips after two consecutive failures.
/// - Time is frozen so the breaker never recovers on its own.
pub fn http_state(source: Arc<dyn UpstreamSource>, cache: Arc<dyn KeyValueCache>) -> HttpState {
    let now = Utc
        .with_ymd_and_hms(2026, 3, 1, 14, 0, 0)
        .single()
        .expect("valid fixed time");
    let config = CircuitBreakerConfig {
        failure_threshold: 2,
        ..CircuitBreakerConfig::default()
    };
    let breaker = Arc::new(CircuitBreaker::new(
        TEST_BREAKER,
        config,
        Arc::new(MutableClock::new(now)),
    ));
    let proxy = Arc::new(ResilientFetchProxy::new(source, cache, breaker));
    let preload = Arc::new(PreloadOrchestrator::new(proxy.clone()));
    HttpState::new(proxy, preload)
}
