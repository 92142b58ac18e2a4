//! Unit tests for the cache-aside read path.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::{FetchError, FetchSource, ResilientFetchProxy};
use crate::domain::ports::{
    KeyValueCache, MockKeyValueCache, MockUpstreamSource, NoOpKeyValueCache,
    RecordingKeyValueCache, UpstreamSourceError,
};
use crate::domain::{
    CacheKeyScheme, CircuitBreaker, CircuitBreakerConfig, CircuitState, DataCategory, Error,
    ErrorCode, FetchParams, SessionKey, TtlPolicy,
};

const THRESHOLD: u32 = 2;

fn lap(number: u32) -> Value {
    json!({"session_key": 9158, "driver_number": 1, "lap_number": number, "lap_duration": 91.743})
}

#[fixture]
fn breaker() -> Arc<CircuitBreaker> {
    Arc::new(CircuitBreaker::new(
        "openf1",
        CircuitBreakerConfig {
            failure_threshold: THRESHOLD,
            recovery_timeout: Duration::from_secs(30),
        },
        Arc::new(DefaultClock),
    ))
}

#[fixture]
fn params() -> FetchParams {
    FetchParams::for_session(SessionKey::new(9158)).with_driver(1)
}

fn proxy(
    source: MockUpstreamSource,
    cache: Arc<dyn KeyValueCache>,
    breaker: Arc<CircuitBreaker>,
) -> ResilientFetchProxy {
    ResilientFetchProxy::new(Arc::new(source), cache, breaker)
}

fn failing_source(times: usize) -> MockUpstreamSource {
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .times(times)
        .returning(|_, _| Err(UpstreamSourceError::status(503_u16, "maintenance")));
    source
}

#[rstest]
#[tokio::test]
async fn second_identical_fetch_is_served_from_cache(
    breaker: Arc<CircuitBreaker>,
    params: FetchParams,
) {
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .times(1)
        .returning(|_, _| Ok(vec![lap(1), lap(2)]));
    let proxy = proxy(source, Arc::new(RecordingKeyValueCache::default()), breaker);

    let first = proxy
        .fetch_with_status(DataCategory::Laps, &params)
        .await
        .expect("first fetch");
    let second = proxy
        .fetch_with_status(DataCategory::Laps, &params)
        .await
        .expect("second fetch");

    assert_eq!(first.source, FetchSource::Upstream);
    assert_eq!(second.source, FetchSource::Cache);
    assert_eq!(first.records, second.records);
}

#[rstest]
#[tokio::test]
async fn unreachable_cache_always_reaches_upstream(
    breaker: Arc<CircuitBreaker>,
    params: FetchParams,
) {
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .times(2)
        .returning(|_, _| Ok(vec![lap(1)]));
    let proxy = proxy(source, Arc::new(NoOpKeyValueCache), breaker);

    for _ in 0..2 {
        let records = proxy
            .fetch(DataCategory::Laps, &params)
            .await
            .expect("fetch succeeds without a cache");
        assert_eq!(records, vec![lap(1)]);
    }
    assert!(!proxy.cache_ready());
}

#[rstest]
#[tokio::test]
async fn cache_hit_skips_upstream_and_breaker(breaker: Arc<CircuitBreaker>, params: FetchParams) {
    let mut cache = MockKeyValueCache::new();
    cache
        .expect_get()
        .times(1)
        .returning(|_| Some(r#"[{"lap_number": 7}]"#.to_owned()));
    cache.expect_set().never();
    let source = MockUpstreamSource::new();
    let proxy = proxy(source, Arc::new(cache), breaker.clone());

    let outcome = proxy
        .fetch_with_status(DataCategory::Laps, &params)
        .await
        .expect("hit");

    assert_eq!(outcome.source, FetchSource::Cache);
    assert_eq!(outcome.records, vec![json!({"lap_number": 7})]);
    assert_eq!(breaker.stats().total_requests, 0);
}

#[rstest]
#[case::live_timing(DataCategory::Intervals)]
#[case::reference_data(DataCategory::Drivers)]
#[tokio::test]
async fn writes_use_the_category_ttl(
    breaker: Arc<CircuitBreaker>,
    params: FetchParams,
    #[case] category: DataCategory,
) {
    let mut source = MockUpstreamSource::new();
    source.expect_fetch().returning(|_, _| Ok(vec![json!({})]));
    let cache = Arc::new(RecordingKeyValueCache::default());
    let policy = TtlPolicy::default().with_override(DataCategory::Intervals, Duration::from_secs(5));
    let proxy = proxy(source, cache.clone(), breaker).with_ttl_policy(policy.clone());

    proxy.fetch(category, &params).await.expect("fetch");

    let key = CacheKeyScheme::default().key_for(category, &params);
    assert_eq!(cache.ttl_of(key.as_str()), Some(policy.ttl_for(category)));
}

#[rstest]
#[tokio::test]
async fn failure_below_threshold_propagates_without_caching(
    breaker: Arc<CircuitBreaker>,
    params: FetchParams,
) {
    let cache = Arc::new(RecordingKeyValueCache::default());
    let proxy = proxy(failing_source(1), cache.clone(), breaker);

    let err = proxy
        .fetch(DataCategory::Laps, &params)
        .await
        .expect_err("below threshold");

    assert!(matches!(
        err,
        FetchError::Upstream(UpstreamSourceError::Status { status: 503, .. })
    ));
    assert!(cache.keys().is_empty());
}

#[rstest]
#[tokio::test]
async fn tripping_failure_serves_and_caches_the_empty_fallback(
    breaker: Arc<CircuitBreaker>,
    params: FetchParams,
) {
    let cache = Arc::new(RecordingKeyValueCache::default());
    let proxy = proxy(failing_source(2), cache.clone(), breaker.clone());

    let _ = proxy.fetch(DataCategory::Laps, &params).await;
    let outcome = proxy
        .fetch_with_status(DataCategory::Laps, &params)
        .await
        .expect("fallback at threshold");

    assert_eq!(outcome.source, FetchSource::Fallback);
    assert!(outcome.records.is_empty());
    assert_eq!(breaker.state(), CircuitState::Open);
    let key = CacheKeyScheme::default().key_for(DataCategory::Laps, &params);
    assert_eq!(
        cache.ttl_of(key.as_str()),
        Some(DataCategory::Laps.default_ttl())
    );
}

#[rstest]
#[tokio::test]
async fn open_breaker_serves_fallback_without_calling_upstream(
    breaker: Arc<CircuitBreaker>,
    params: FetchParams,
) {
    let proxy = proxy(
        failing_source(2),
        Arc::new(NoOpKeyValueCache),
        breaker.clone(),
    );
    let _ = proxy.fetch(DataCategory::Laps, &params).await;
    let _ = proxy.fetch(DataCategory::Laps, &params).await;

    let outcome = proxy
        .fetch_with_status(DataCategory::Stints, &params)
        .await
        .expect("fallback while open");

    assert_eq!(outcome.source, FetchSource::Fallback);
    assert_eq!(breaker.stats().rejected_requests, 1);
}

#[rstest]
#[tokio::test]
async fn undecodable_cache_entries_are_treated_as_misses(
    breaker: Arc<CircuitBreaker>,
    params: FetchParams,
) {
    let mut cache = MockKeyValueCache::new();
    cache
        .expect_get()
        .returning(|_| Some("not json".to_owned()));
    cache.expect_delete().times(1).return_const(());
    cache.expect_set().times(1).return_const(());
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .times(1)
        .returning(|_, _| Ok(vec![lap(3)]));
    let proxy = proxy(source, Arc::new(cache), breaker);

    let outcome = proxy
        .fetch_with_status(DataCategory::Laps, &params)
        .await
        .expect("refetched");
    assert_eq!(outcome.source, FetchSource::Upstream);
}

#[rstest]
#[tokio::test]
async fn invalidation_removes_only_the_targeted_prefix(breaker: Arc<CircuitBreaker>) {
    let mut source = MockUpstreamSource::new();
    source.expect_fetch().returning(|_, _| Ok(vec![json!({})]));
    let cache = Arc::new(RecordingKeyValueCache::default());
    let proxy = proxy(source, cache.clone(), breaker);
    let race = FetchParams::for_session(SessionKey::new(9158));
    let sprint = FetchParams::for_session(SessionKey::new(9157));

    for params in [&race, &sprint] {
        proxy.fetch(DataCategory::Laps, params).await.expect("laps");
        proxy.fetch(DataCategory::Pit, params).await.expect("pit");
    }

    proxy
        .invalidate_category(SessionKey::new(9158), DataCategory::Pit)
        .await;
    assert_eq!(cache.keys().len(), 3);

    proxy.invalidate_session(SessionKey::new(9158)).await;
    let remaining = cache.keys();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|key| key.contains(":9157:")));
}

#[test]
fn fetch_errors_map_to_service_unavailable() {
    let upstream: Error = FetchError::Upstream(UpstreamSourceError::timeout("10s")).into();
    assert_eq!(upstream.code(), ErrorCode::ServiceUnavailable);

    assert_eq!(upstream.retry_after_secs(), None);

    let open: Error = FetchError::CircuitOpen {
        breaker: "openf1".to_owned(),
        retry_after: Duration::from_millis(12_300),
    }
    .into();
    assert_eq!(open.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(
        open.details().and_then(|details| details.get("breaker")),
        Some(&json!("openf1"))
    );
    assert_eq!(open.retry_after_secs(), Some(13));
}

#[rstest]
#[tokio::test]
async fn rate_limited_failures_carry_the_recovery_interval(
    breaker: Arc<CircuitBreaker>,
    params: FetchParams,
) {
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .times(1)
        .returning(|_, _| Err(UpstreamSourceError::status(429_u16, "rate limited: slow down")));
    let proxy = proxy(source, Arc::new(NoOpKeyValueCache), breaker);

    let err = proxy
        .fetch(DataCategory::CarData, &params)
        .await
        .expect_err("below threshold");

    assert!(matches!(
        err,
        FetchError::RateLimited { retry_after, .. } if retry_after == Duration::from_secs(30)
    ));
    let error: Error = err.into();
    assert_eq!(
        error.details().and_then(|details| details.get("reason")),
        Some(&json!("rate_limited"))
    );
    assert_eq!(error.retry_after_secs(), Some(30));
}

#[rstest]
#[tokio::test]
async fn cached_fallback_is_still_reported_as_fallback(
    breaker: Arc<CircuitBreaker>,
    params: FetchParams,
) {
    let cache = Arc::new(RecordingKeyValueCache::default());
    let proxy = proxy(failing_source(2), cache.clone(), breaker.clone());
    let _ = proxy.fetch(DataCategory::Drivers, &params).await;
    let first = proxy
        .fetch_with_status(DataCategory::Drivers, &params)
        .await
        .expect("fallback at threshold");
    assert_eq!(first.source, FetchSource::Fallback);

    breaker.reset();
    let again = proxy
        .fetch_with_status(DataCategory::Drivers, &params)
        .await
        .expect("served from cache");

    assert_eq!(again.source, FetchSource::Fallback);
    assert!(again.records.is_empty());
    assert_eq!(breaker.stats().total_requests, 0);
}

#[test]
fn cache_header_values() {
    assert_eq!(FetchSource::Cache.cache_header(), "hit");
    assert_eq!(FetchSource::Upstream.cache_header(), "miss");
    assert_eq!(FetchSource::Fallback.cache_header(), "fallback");
}
