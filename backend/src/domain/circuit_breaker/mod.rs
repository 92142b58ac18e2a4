//! Per-dependency circuit breaker guarding upstream calls.
//!
//! The breaker owns call admission for one upstream dependency. Consecutive
//! failures beyond the configured threshold open it; after the recovery
//! timeout a single probe is admitted and its outcome closes or re-opens it.
//! Callers may supply a fallback value that is returned instead of an error
//! whenever the breaker rejects the call or the failure tripped it.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mockable::Clock;
use thiserror::Error;
use tracing::{debug, info, warn};

mod policy;

use policy::{Admission, BreakerPolicyState, Transition};
pub use policy::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};

/// Error surfaced by [`CircuitBreaker::execute`] when no fallback applies.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The breaker rejected the call without running the action.
    #[error("circuit breaker {breaker} is open")]
    Open {
        /// Breaker name.
        breaker: String,
        /// Time until the next probe may be admitted.
        retry_after: Duration,
    },
    /// The action ran and failed.
    #[error("{0}")]
    Failed(E),
}

impl<E> CircuitBreakerError<E> {
    /// True when the call was rejected by an open breaker.
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Breaker guarding one named upstream dependency.
pub struct CircuitBreaker {
    name: String,
    clock: Arc<dyn Clock>,
    state: Mutex<BreakerPolicyState>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.lock_state().state())
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Build a closed breaker.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use paddock::domain::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
    ///
    /// let breaker = CircuitBreaker::new(
    ///     "openf1",
    ///     CircuitBreakerConfig::default(),
    ///     Arc::new(mockable::DefaultClock),
    /// );
    /// assert_eq!(breaker.state(), CircuitState::Closed);
    /// ```
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            clock,
            state: Mutex::new(BreakerPolicyState::new(config)),
        }
    }

    /// Dependency name used in logs and stats.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Effective configuration (threshold clamped to at least one).
    pub fn config(&self) -> CircuitBreakerConfig {
        self.lock_state().config()
    }

    /// Current state, without triggering the open to half-open transition.
    pub fn state(&self) -> CircuitState {
        self.lock_state().state()
    }

    /// Run `action` under breaker control.
    ///
    /// - Rejected calls return `fallback` when supplied, otherwise
    ///   [`CircuitBreakerError::Open`].
    /// - A failure that leaves the failure count at or above the threshold,
    ///   or the breaker open, returns `fallback` when supplied.
    /// - Any other failure is returned as [`CircuitBreakerError::Failed`].
    ///
    /// The state lock is released while `action` runs.
    ///
    /// # Errors
    ///
    /// See the list above.
    pub async fn execute<T, E, F, Fut>(
        &self,
        action: F,
        fallback: Option<T>,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let now = self.clock.utc();
        let (admission, retry_after) = {
            let mut state = self.lock_state();
            let admission = state.admit(now);
            (admission, state.retry_after(now))
        };
        let probe = match admission {
            Admission::Allowed { probe } => probe,
            Admission::Rejected => {
                debug!(breaker = %self.name, ?retry_after, "circuit open; call rejected");
                return fallback.ok_or_else(|| CircuitBreakerError::Open {
                    breaker: self.name.clone(),
                    retry_after,
                });
            }
        };
        if probe {
            info!(breaker = %self.name, "circuit half-open; admitting probe");
        }

        match action().await {
            Ok(value) => {
                let transition = self.lock_state().record_success(probe);
                if transition == Some(Transition::Closed) {
                    info!(breaker = %self.name, "probe succeeded; circuit closed");
                }
                Ok(value)
            }
            Err(error) => {
                let (transition, tripped, failures) = {
                    let mut state = self.lock_state();
                    let transition = state.record_failure(self.clock.utc(), probe);
                    (
                        transition,
                        state.threshold_reached() || state.state() == CircuitState::Open,
                        state.snapshot(&self.name).consecutive_failures,
                    )
                };
                match transition {
                    Some(Transition::Opened) => warn!(
                        breaker = %self.name,
                        consecutive_failures = failures,
                        error = %error,
                        "failure threshold reached; circuit opened"
                    ),
                    Some(Transition::Reopened) => warn!(
                        breaker = %self.name,
                        error = %error,
                        "probe failed; circuit re-opened"
                    ),
                    Some(Transition::Closed) | None => debug!(
                        breaker = %self.name,
                        consecutive_failures = failures,
                        error = %error,
                        "guarded call failed"
                    ),
                }
                match fallback {
                    Some(value) if tripped => Ok(value),
                    _ => Err(CircuitBreakerError::Failed(error)),
                }
            }
        }
    }

    /// Snapshot of state and counters.
    pub fn stats(&self) -> CircuitBreakerStats {
        self.lock_state().snapshot(&self.name)
    }

    /// Force the breaker closed and clear all counters.
    pub fn reset(&self) {
        self.lock_state().reset();
        info!(breaker = %self.name, "circuit breaker reset");
    }

    fn lock_state(&self) -> MutexGuard<'_, BreakerPolicyState> {
        // Every mutation leaves the state consistent, so a poisoned guard is
        // still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
