//! Telemetry read and cache management endpoints.
//!
//! ```text
//! GET    /api/v1/{category}
//! GET    /api/v1/sessions/{session_key}/laps/decoded
//! POST   /api/v1/sessions/{session_key}/preload
//! DELETE /api/v1/sessions/{session_key}/cache
//! ```
//!
//! Record reads carry an `X-Cache` header (`hit`, `miss` or `fallback`) so
//! clients can tell an unavailable upstream from a genuinely empty result.

use actix_web::{HttpResponse, delete, get, post, web};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::decoder::{SectorSummary, decode_lap_sectors, lap_did_not_finish};
use crate::domain::{
    DataCategory, Error, FetchOutcome, FetchParams, FetchParamsError, PreloadSummary, SessionKey,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Response header reporting where records were served from.
pub const X_CACHE_HEADER: &str = "X-Cache";

fn parse_category(raw: &str) -> Result<DataCategory, Error> {
    raw.parse().map_err(|_| {
        Error::not_found(format!("unknown data category: {raw}")).with_details(json!({
            "category": raw,
            "known": DataCategory::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        }))
    })
}

fn parse_session_key(raw: &str) -> Result<SessionKey, Error> {
    raw.parse().map_err(|err: FetchParamsError| invalid_params(&err))
}

fn invalid_params(err: &FetchParamsError) -> Error {
    Error::invalid_request(err.to_string())
}

fn records_response(outcome: FetchOutcome) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((X_CACHE_HEADER, outcome.source.cache_header()))
        .json(outcome.records)
}

/// Fetch records for one data category.
#[utoipa::path(
    get,
    path = "/api/v1/{category}",
    params(
        ("category" = DataCategory, Path, description = "Data category, e.g. `laps`"),
    ),
    description = "Proxy a category read through the cache. Query parameters are forwarded upstream. Example request: GET /api/v1/laps?session_key=9158&driver_number=1",
    responses(
        (
            status = 200,
            description = "Raw upstream records",
            headers(("X-Cache" = String, description = "hit, miss or fallback")),
            body = Vec<serde_json::Value>
        ),
        (status = 400, description = "Invalid query parameters", body = Error),
        (status = 404, description = "Unknown category", body = Error),
        (status = 503, description = "Upstream unavailable", body = Error)
    ),
    tags = ["telemetry"],
    operation_id = "fetchCategory"
)]
#[get("/{category}")]
pub async fn fetch_category(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
) -> ApiResult<HttpResponse> {
    let category = parse_category(&path)?;
    let params = FetchParams::from_pairs(query.into_inner()).map_err(|err| invalid_params(&err))?;
    let outcome = state.proxy.fetch_with_status(category, &params).await?;
    Ok(records_response(outcome))
}

/// One lap with its sector segments decoded.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecodedLap {
    /// Lap number within the session.
    #[schema(example = 12)]
    pub lap_number: Option<u64>,
    /// Car number of the driver.
    #[schema(example = 1)]
    pub driver_number: Option<u64>,
    /// Whether the lap has no recorded duration.
    pub did_not_finish: bool,
    /// Sectors one to three, in order.
    pub sectors: Vec<SectorSummary>,
}

impl From<&Value> for DecodedLap {
    fn from(record: &Value) -> Self {
        Self {
            lap_number: record.get("lap_number").and_then(Value::as_u64),
            driver_number: record.get("driver_number").and_then(Value::as_u64),
            did_not_finish: lap_did_not_finish(record),
            sectors: decode_lap_sectors(record).to_vec(),
        }
    }
}

/// Fetch the laps of a session with segment codes decoded.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_key}/laps/decoded",
    params(
        ("session_key" = u32, Path, description = "Session identifier"),
        ("driver_number" = Option<u32>, Query, description = "Restrict to one driver"),
        ("lap_number" = Option<u32>, Query, description = "Restrict to one lap"),
    ),
    description = "Other query parameters are forwarded upstream as filters. A `session_key` query parameter must match the path.",
    responses(
        (
            status = 200,
            description = "Decoded laps",
            headers(("X-Cache" = String, description = "hit, miss or fallback")),
            body = [DecodedLap]
        ),
        (status = 400, description = "Invalid parameters", body = Error),
        (status = 503, description = "Upstream unavailable", body = Error)
    ),
    tags = ["telemetry"],
    operation_id = "decodedLaps"
)]
#[get("/sessions/{session_key}/laps/decoded")]
pub async fn decoded_laps(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
) -> ApiResult<HttpResponse> {
    let session_key = parse_session_key(&path)?;
    let filters = FetchParams::from_pairs(query.into_inner()).map_err(|err| invalid_params(&err))?;
    if let Some(conflicting) = filters.session_key().filter(|key| *key != session_key) {
        return Err(
            Error::invalid_request("session_key query parameter conflicts with the path")
                .with_details(json!({
                    "field": "session_key",
                    "path": session_key,
                    "query": conflicting,
                })),
        );
    }
    let params = filters.with_session(session_key);

    let outcome = state
        .proxy
        .fetch_with_status(DataCategory::Laps, &params)
        .await?;
    let laps: Vec<DecodedLap> = outcome.records.iter().map(DecodedLap::from).collect();
    Ok(HttpResponse::Ok()
        .insert_header((X_CACHE_HEADER, outcome.source.cache_header()))
        .json(laps))
}

/// Warm the cache with every replay category of a session.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_key}/preload",
    params(("session_key" = u32, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Per-category record counts", body = PreloadSummary),
        (status = 400, description = "Invalid session key", body = Error)
    ),
    tags = ["telemetry"],
    operation_id = "preloadSession"
)]
#[post("/sessions/{session_key}/preload")]
pub async fn preload_session(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let session_key = parse_session_key(&path)?;
    let result = state.preload.preload(session_key).await;
    Ok(HttpResponse::Ok().json(result.summary()))
}

/// Drop cached entries for a session, optionally for one category only.
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{session_key}/cache",
    params(
        ("session_key" = u32, Path, description = "Session identifier"),
        ("category" = Option<DataCategory>, Query, description = "Only invalidate this category"),
    ),
    responses(
        (status = 204, description = "Entries removed"),
        (status = 400, description = "Invalid session key", body = Error),
        (status = 404, description = "Unknown category", body = Error)
    ),
    tags = ["telemetry"],
    operation_id = "invalidateSessionCache"
)]
#[delete("/sessions/{session_key}/cache")]
pub async fn invalidate_session_cache(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
) -> ApiResult<HttpResponse> {
    let session_key = parse_session_key(&path)?;
    let category = query
        .iter()
        .find(|(name, _)| name == "category")
        .map(|(_, value)| parse_category(value))
        .transpose()?;

    match category {
        Some(category) => state.proxy.invalidate_category(session_key, category).await,
        None => state.proxy.invalidate_session(session_key).await,
    }
    info!(%session_key, category = ?category, "session cache invalidated");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
