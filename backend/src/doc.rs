//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint from the inbound layer together
//! with the payload schemas they reference. The generated document is served
//! by Swagger UI in debug builds.

use utoipa::OpenApi;

use crate::domain::decoder::{SectorSummary, SegmentStatus};
use crate::domain::{
    CircuitBreakerStats, CircuitState, DataCategory, Error, ErrorCode, PreloadSummary,
};
use crate::inbound::http::health::{CacheHealth, ReadinessReport};
use crate::inbound::http::telemetry::DecodedLap;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Paddock telemetry gateway",
        description = "Cached, circuit-protected access to racing telemetry with replay preloading.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::telemetry::fetch_category,
        crate::inbound::http::telemetry::decoded_laps,
        crate::inbound::http::telemetry::preload_session,
        crate::inbound::http::telemetry::invalidate_session_cache,
        crate::inbound::http::admin::list_circuit_breakers,
        crate::inbound::http::admin::reset_circuit_breaker,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        DataCategory,
        CircuitBreakerStats,
        CircuitState,
        PreloadSummary,
        DecodedLap,
        SectorSummary,
        SegmentStatus,
        ReadinessReport,
        CacheHealth,
    )),
    tags(
        (name = "telemetry", description = "Cached telemetry reads and cache management"),
        (name = "admin", description = "Circuit breaker inspection and control"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
