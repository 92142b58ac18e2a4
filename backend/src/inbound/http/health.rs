//! Health endpoints: liveness & readiness probes for orchestration and load balancers.
//! Document endpoints in OpenAPI via Utoipa.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ports::KeyValueCache;

/// Shared health state for readiness and liveness checks.
///
/// Readiness tracks whether the server finished starting. Cache readiness is
/// reported alongside it but never fails the probe: a degraded cache only
/// means reads go straight to upstream.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    cache: Option<Arc<dyn KeyValueCache>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            cache: None,
        }
    }
}

/// Cache status reported by the readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CacheHealth {
    /// The shared cache is accepting operations.
    Ready,
    /// The shared cache is unreachable; reads always miss.
    Degraded,
    /// No shared cache is configured.
    Unconfigured,
}

/// Readiness probe payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReadinessReport {
    /// Whether the server accepts traffic.
    pub ready: bool,
    /// State of the response cache.
    pub cache: CacheHealth,
}

impl HealthState {
    /// Create a new health state starting as not ready but live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the readiness of `cache` from the readiness probe.
    pub fn with_cache(mut self, cache: Arc<dyn KeyValueCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Mark the service as ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Flag the service as unhealthy so liveness checks fail fast during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Return readiness state.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Return liveness state. When false, liveness probes emit 503 to trigger restarts.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Current readiness snapshot.
    pub fn readiness(&self) -> ReadinessReport {
        let cache = match &self.cache {
            None => CacheHealth::Unconfigured,
            Some(cache) if cache.is_ready() => CacheHealth::Ready,
            Some(_) => CacheHealth::Degraded,
        };
        ReadinessReport {
            ready: self.is_ready(),
            cache,
        }
    }

    fn probe_status(probe_ok: bool) -> actix_web::HttpResponseBuilder {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };
        response.insert_header((header::CACHE_CONTROL, "no-store"));
        response
    }
}

/// Readiness probe. Return 200 once the server has started; 503 otherwise.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is ready to handle traffic", body = ReadinessReport),
        (status = 503, description = "Server is not ready", body = ReadinessReport)
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    let report = state.readiness();
    HealthState::probe_status(report.ready).json(report)
}

/// Liveness probe. Return 200 while the process is marked alive and 503 once draining.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is alive"),
        (status = 503, description = "Server is shutting down")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_status(state.is_alive()).finish()
}
