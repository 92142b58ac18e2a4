//! Circuit breaker administration endpoints.
//!
//! ```text
//! GET  /admin/circuit-breakers
//! POST /admin/circuit-breakers/{name}/reset
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde_json::json;
use tracing::info;

use crate::domain::{CircuitBreakerStats, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// List statistics for every registered breaker.
#[utoipa::path(
    get,
    path = "/admin/circuit-breakers",
    responses(
        (status = 200, description = "Breaker statistics", body = [CircuitBreakerStats])
    ),
    tags = ["admin"],
    operation_id = "listCircuitBreakers"
)]
#[get("/admin/circuit-breakers")]
pub async fn list_circuit_breakers(state: web::Data<HttpState>) -> HttpResponse {
    let stats: Vec<CircuitBreakerStats> = state
        .breakers()
        .iter()
        .map(|breaker| breaker.stats())
        .collect();
    HttpResponse::Ok().json(stats)
}

/// Force a breaker closed and clear its counters.
#[utoipa::path(
    post,
    path = "/admin/circuit-breakers/{name}/reset",
    params(("name" = String, Path, description = "Breaker name")),
    responses(
        (status = 200, description = "Statistics after the reset", body = CircuitBreakerStats),
        (status = 404, description = "Unknown breaker", body = Error)
    ),
    tags = ["admin"],
    operation_id = "resetCircuitBreaker"
)]
#[post("/admin/circuit-breakers/{name}/reset")]
pub async fn reset_circuit_breaker(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let name = path.into_inner();
    let breaker = state.breaker(&name).ok_or_else(|| {
        Error::not_found(format!("unknown circuit breaker: {name}"))
            .with_details(json!({ "breaker": name }))
    })?;
    breaker.reset();
    info!(breaker = %name, "circuit breaker reset via admin endpoint");
    Ok(HttpResponse::Ok().json(breaker.stats()))
}
