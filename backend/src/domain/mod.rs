//! Domain layer: the resilient caching fetch path and its primitives.
//!
//! Purpose: decide whether a category read is served from the cache or the
//! upstream telemetry API, protect upstream with a circuit breaker, and fan
//! reads out for replay preloads. Adapters plug in through [`ports`].
//!
//! Public surface:
//! - [`ResilientFetchProxy`]: cache-aside fetch per category.
//! - [`PreloadOrchestrator`]: concurrent warm-up of one session.
//! - [`CircuitBreaker`]: per-dependency trip/recovery state machine.
//! - [`CacheKeyScheme`] and [`TtlPolicy`]: key layout and expiry table.
//! - [`decoder`]: pure decoders for DRS and segment codes.
//! - [`Error`]: transport-agnostic error payload.

pub mod cache_key;
pub mod category;
pub mod circuit_breaker;
pub mod decoder;
pub mod error;
pub mod fetch_params;
pub mod fetch_proxy;
pub mod ports;
pub mod preload;
pub mod trace_id;
pub mod ttl_policy;

pub use self::cache_key::{CacheKey, CacheKeyScheme, CacheKeyValidationError};
pub use self::category::{DataCategory, UnknownCategoryError};
pub use self::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerStats, CircuitState,
};
pub use self::error::{
    Error, ErrorCode, ErrorValidationError, RETRY_AFTER_DETAIL, TRACE_ID_HEADER,
};
pub use self::fetch_params::{FetchParams, FetchParamsError, SessionKey};
pub use self::fetch_proxy::{FetchError, FetchOutcome, FetchSource, ResilientFetchProxy};
pub use self::preload::{PreloadOrchestrator, PreloadResult, PreloadSummary};
pub use self::trace_id::TraceId;
pub use self::ttl_policy::{MAX_TTL, TtlPolicy, TtlPolicyError};
