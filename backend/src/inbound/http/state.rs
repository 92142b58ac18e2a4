//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use std::sync::Arc;

use crate::domain::{CircuitBreaker, PreloadOrchestrator, ResilientFetchProxy};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub proxy: Arc<ResilientFetchProxy>,
    pub preload: Arc<PreloadOrchestrator>,
    breakers: Vec<Arc<CircuitBreaker>>,
}

impl HttpState {
    /// Construct state from the proxy and orchestrator.
    ///
    /// The proxy's breaker is registered for the admin endpoints.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use paddock::domain::ports::{FixtureUpstreamSource, NoOpKeyValueCache};
    /// use paddock::domain::{
    ///     CircuitBreaker, CircuitBreakerConfig, PreloadOrchestrator, ResilientFetchProxy,
    /// };
    /// use paddock::inbound::http::state::HttpState;
    ///
    /// let breaker = Arc::new(CircuitBreaker::new(
    ///     "openf1",
    ///     CircuitBreakerConfig::default(),
    ///     Arc::new(DefaultClock),
    /// ));
    /// let proxy = Arc::new(ResilientFetchProxy::new(
    ///     Arc::new(FixtureUpstreamSource),
    ///     Arc::new(NoOpKeyValueCache),
    ///     breaker,
    /// ));
    /// let preload = Arc::new(PreloadOrchestrator::new(proxy.clone()));
    /// let state = HttpState::new(proxy, preload);
    /// assert!(state.breaker("openf1").is_some());
    /// ```
    pub fn new(proxy: Arc<ResilientFetchProxy>, preload: Arc<PreloadOrchestrator>) -> Self {
        let breakers = vec![proxy.breaker().clone()];
        Self {
            proxy,
            preload,
            breakers,
        }
    }

    /// Every registered breaker in registration order.
    pub fn breakers(&self) -> &[Arc<CircuitBreaker>] {
        &self.breakers
    }

    /// Look up a breaker by name.
    pub fn breaker(&self, name: &str) -> Option<&Arc<CircuitBreaker>> {
        self.breakers.iter().find(|breaker| breaker.name() == name)
    }
}
