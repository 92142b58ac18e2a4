//! Paddock: a resilient caching gateway in front of a racing-telemetry API.
//!
//! - [`domain`]: circuit breaker, cache-aside fetch proxy, preload and decoders.
//! - [`outbound`]: Redis and in-memory caches, the reqwest upstream source.
//! - [`inbound`]: actix-web handlers.
//! - [`settings`]: configuration loaded via OrthoConfig.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
