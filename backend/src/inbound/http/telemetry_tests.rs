//! Tests for telemetry HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    KeyValueCache, MockUpstreamSource, RecordingKeyValueCache, UpstreamSourceError,
};
use crate::inbound::http::test_utils::http_state;

fn test_app(
    state: HttpState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new().app_data(web::Data::new(state)).service(
        web::scope("/api/v1")
            .service(decoded_laps)
            .service(preload_session)
            .service(invalidate_session_cache)
            .service(fetch_category),
    )
}

fn source_returning(records: Value, times: usize) -> MockUpstreamSource {
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .times(times)
        .returning(move |_, _| Ok(records.as_array().cloned().unwrap_or_default()));
    source
}

fn x_cache(res: &actix_web::dev::ServiceResponse) -> String {
    res.headers()
        .get(X_CACHE_HEADER)
        .expect("X-Cache header")
        .to_str()
        .expect("ascii header")
        .to_owned()
}

#[actix_web::test]
async fn second_read_is_served_from_cache() {
    let records = json!([{"lap_number": 1, "driver_number": 44}]);
    let state = http_state(
        Arc::new(source_returning(records.clone(), 1)),
        Arc::new(RecordingKeyValueCache::default()),
    );
    let app = actix_test::init_service(test_app(state)).await;

    for expected in ["miss", "hit"] {
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/laps?session_key=9158&driver_number=44")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(x_cache(&res), expected);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body, records);
    }
}

#[actix_web::test]
async fn unknown_category_is_not_found() {
    let state = http_state(
        Arc::new(MockUpstreamSource::new()),
        Arc::new(RecordingKeyValueCache::default()),
    );
    let app = actix_test::init_service(test_app(state)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/tyre_temps")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["details"]["category"], "tyre_temps");
}

#[actix_web::test]
async fn malformed_identifiers_are_rejected() {
    let state = http_state(
        Arc::new(MockUpstreamSource::new()),
        Arc::new(RecordingKeyValueCache::default()),
    );
    let app = actix_test::init_service(test_app(state)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/laps?session_key=latest")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["code"], "invalid_request");
}

#[actix_web::test]
async fn upstream_failures_degrade_to_the_fallback() {
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .times(2)
        .returning(|_, _| Err(UpstreamSourceError::status(500_u16, "boom")));
    let state = http_state(
        Arc::new(source),
        Arc::new(RecordingKeyValueCache::default()),
    );
    let app = actix_test::init_service(test_app(state)).await;
    let request = || {
        actix_test::TestRequest::get()
            .uri("/api/v1/weather?session_key=9158")
            .to_request()
    };

    let first = actix_test::call_service(&app, request()).await;
    assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = actix_test::read_body_json(first).await;
    assert_eq!(body["code"], "service_unavailable");
    assert_eq!(body["details"]["reason"], "upstream_failure");

    let second = actix_test::call_service(&app, request()).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(x_cache(&second), "fallback");
    let body: Value = actix_test::read_body_json(second).await;
    assert_eq!(body, json!([]));

    let cached = actix_test::call_service(&app, request()).await;
    assert_eq!(cached.status(), StatusCode::OK);
    assert_eq!(x_cache(&cached), "fallback");
}

#[actix_web::test]
async fn rate_limited_upstream_sets_retry_after() {
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .times(1)
        .returning(|_, _| Err(UpstreamSourceError::status(429_u16, "rate limited: slow down")));
    let state = http_state(
        Arc::new(source),
        Arc::new(RecordingKeyValueCache::default()),
    );
    let app = actix_test::init_service(test_app(state)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/car_data?session_key=9158&driver_number=1")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        res.headers()
            .get(actix_web::http::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok()),
        Some("30")
    );
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["details"]["reason"], "rate_limited");
}

#[actix_web::test]
async fn decoded_laps_summarise_sectors() {
    let records = json!([{
        "lap_number": 12,
        "driver_number": 1,
        "lap_duration": null,
        "segments_sector_1": [2048, 2051, 2049],
        "segments_sector_2": [2064, 2048],
        "segments_sector_3": []
    }]);
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .withf(|category, params| {
            *category == DataCategory::Laps
                && params.session_key() == Some(SessionKey::new(9158))
                && params.driver_number() == Some(1)
        })
        .times(1)
        .returning(move |_, _| Ok(records.as_array().cloned().unwrap_or_default()));
    let state = http_state(
        Arc::new(source),
        Arc::new(RecordingKeyValueCache::default()),
    );
    let app = actix_test::init_service(test_app(state)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/sessions/9158/laps/decoded?driver_number=1")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body[0]["lapNumber"], 12);
    assert_eq!(body[0]["didNotFinish"], true);
    assert_eq!(body[0]["sectors"][0]["status"], "personal_best");
    assert_eq!(body[0]["sectors"][1]["status"], "pit");
    assert_eq!(body[0]["sectors"][1]["pitLane"], true);
    assert_eq!(body[0]["sectors"][2]["status"], "none");
}

#[actix_web::test]
async fn decoded_laps_forward_every_filter() {
    let mut source = MockUpstreamSource::new();
    source
        .expect_fetch()
        .withf(|category, params| {
            *category == DataCategory::Laps
                && params.session_key() == Some(SessionKey::new(9158))
                && params.lap_number() == Some(7)
                && params.filters().get("is_pit_out_lap").map(String::as_str) == Some("false")
        })
        .times(1)
        .returning(|_, _| Ok(vec![json!({"lap_number": 7, "lap_duration": 90.1})]));
    let state = http_state(
        Arc::new(source),
        Arc::new(RecordingKeyValueCache::default()),
    );
    let app = actix_test::init_service(test_app(state)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/sessions/9158/laps/decoded?lap_number=7&is_pit_out_lap=false")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body[0]["lapNumber"], 7);
    assert_eq!(body[0]["didNotFinish"], false);
}

#[actix_web::test]
async fn decoded_laps_reject_a_conflicting_session() {
    let state = http_state(
        Arc::new(MockUpstreamSource::new()),
        Arc::new(RecordingKeyValueCache::default()),
    );
    let app = actix_test::init_service(test_app(state)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/sessions/9158/laps/decoded?session_key=9165")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["details"]["field"], "session_key");
    assert_eq!(body["details"]["query"], 9165);
}

#[actix_web::test]
async fn preload_reports_counts_and_failures() {
    let mut source = MockUpstreamSource::new();
    source.expect_fetch().returning(|category, _| {
        if category == DataCategory::Weather {
            Err(UpstreamSourceError::status(500_u16, "weather feed down"))
        } else {
            Ok(vec![json!({ "category": category.as_str() })])
        }
    });
    let state = http_state(
        Arc::new(source),
        Arc::new(RecordingKeyValueCache::default()),
    );
    let app = actix_test::init_service(test_app(state)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/sessions/9158/preload")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["sessionKey"], 9158);
    assert_eq!(body["recordCounts"]["laps"], 1);
    assert_eq!(body["recordCounts"]["weather"], 0);
    assert_eq!(body["failedCategories"], json!(["weather"]));
}

#[actix_web::test]
async fn invalidation_forces_a_fresh_upstream_read() {
    let cache = Arc::new(RecordingKeyValueCache::default());
    let state = http_state(
        Arc::new(source_returning(json!([{"lap_number": 1}]), 2)),
        cache.clone(),
    );
    let app = actix_test::init_service(test_app(state)).await;
    let read = || {
        actix_test::TestRequest::get()
            .uri("/api/v1/laps?session_key=9158")
            .to_request()
    };

    let first = actix_test::call_service(&app, read()).await;
    assert_eq!(x_cache(&first), "miss");
    assert!(!cache.keys().is_empty());

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri("/api/v1/sessions/9158/cache?category=laps")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(cache.keys().is_empty());

    let again = actix_test::call_service(&app, read()).await;
    assert_eq!(x_cache(&again), "miss");
}

#[actix_web::test]
async fn invalidation_rejects_unknown_categories() {
    let cache: Arc<dyn KeyValueCache> = Arc::new(RecordingKeyValueCache::default());
    let state = http_state(Arc::new(MockUpstreamSource::new()), cache);
    let app = actix_test::init_service(test_app(state)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri("/api/v1/sessions/9158/cache?category=tyres")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
