//! Circuit breaker state machine (closed/open/half-open) and its counters.
//!
//! The state is plain data mutated synchronously; the owning
//! [`super::CircuitBreaker`] serialises access with a mutex that is never held
//! across an await point.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Circuit breaker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures required to open the breaker.
    pub failure_threshold: u32,
    /// Time since the last failure before a half-open probe is admitted.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// Calls are rejected until the recovery timeout elapses.
    Open,
    /// One probe call is in flight.
    HalfOpen,
}

/// Admission decision for one call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Admission {
    /// The action may run. `probe` marks the single half-open trial.
    Allowed { probe: bool },
    /// The breaker is open (or a probe is already in flight).
    Rejected,
}

/// State change produced by recording an outcome, reported for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Transition {
    Opened,
    Reopened,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitInternalState {
    Closed,
    Open,
    HalfOpen { probe_started_at: DateTime<Utc> },
}

/// Point-in-time statistics for the operational surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerStats {
    /// Upstream dependency guarded by this breaker.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Configured trip threshold.
    pub failure_threshold: u32,
    /// Configured recovery timeout in milliseconds.
    pub recovery_timeout_ms: u64,
    /// Instant of the most recent failure.
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Calls that reached the action.
    pub total_requests: u64,
    /// Calls whose action succeeded.
    pub successful_requests: u64,
    /// Calls whose action failed.
    pub failed_requests: u64,
    /// Calls rejected without running the action.
    pub rejected_requests: u64,
}

/// Mutable breaker state shared by every caller of one dependency.
#[derive(Debug, Clone)]
pub(super) struct BreakerPolicyState {
    config: CircuitBreakerConfig,
    state: CircuitInternalState,
    consecutive_failures: u32,
    last_failure_at: Option<DateTime<Utc>>,
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    rejected_requests: u64,
}

impl BreakerPolicyState {
    pub(super) fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: CircuitBreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                recovery_timeout: config.recovery_timeout,
            },
            state: CircuitInternalState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            rejected_requests: 0,
        }
    }

    pub(super) fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// Decide whether one call may run, moving `OPEN → HALF_OPEN` once the
    /// recovery timeout has elapsed since the last failure.
    pub(super) fn admit(&mut self, now: DateTime<Utc>) -> Admission {
        match self.state {
            CircuitInternalState::Closed => Admission::Allowed { probe: false },
            CircuitInternalState::Open if self.recovery_elapsed(now) => {
                self.state = CircuitInternalState::HalfOpen {
                    probe_started_at: now,
                };
                Admission::Allowed { probe: true }
            }
            // A probe whose caller was dropped never records an outcome, so a
            // stale probe is replaced rather than holding the breaker forever.
            CircuitInternalState::HalfOpen { probe_started_at }
                if elapsed_at_least(probe_started_at, now, self.config.recovery_timeout) =>
            {
                self.state = CircuitInternalState::HalfOpen {
                    probe_started_at: now,
                };
                Admission::Allowed { probe: true }
            }
            CircuitInternalState::Open | CircuitInternalState::HalfOpen { .. } => {
                self.rejected_requests = self.rejected_requests.saturating_add(1);
                Admission::Rejected
            }
        }
    }

    /// Record a successful action. Only the half-open probe may close the
    /// breaker; calls admitted before it tripped leave the state alone.
    pub(super) fn record_success(&mut self, probe: bool) -> Option<Transition> {
        self.total_requests = self.total_requests.saturating_add(1);
        self.successful_requests = self.successful_requests.saturating_add(1);
        self.consecutive_failures = 0;

        match self.state {
            CircuitInternalState::HalfOpen { .. } if probe => {
                self.state = CircuitInternalState::Closed;
                Some(Transition::Closed)
            }
            CircuitInternalState::Closed
            | CircuitInternalState::Open
            | CircuitInternalState::HalfOpen { .. } => None,
        }
    }

    /// Record a failed action. Only the half-open probe may re-open the
    /// breaker from `HALF_OPEN`.
    pub(super) fn record_failure(&mut self, now: DateTime<Utc>, probe: bool) -> Option<Transition> {
        self.total_requests = self.total_requests.saturating_add(1);
        self.failed_requests = self.failed_requests.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_at = Some(now);

        match self.state {
            CircuitInternalState::HalfOpen { .. } if probe => {
                self.state = CircuitInternalState::Open;
                Some(Transition::Reopened)
            }
            CircuitInternalState::Closed if self.threshold_reached() => {
                self.state = CircuitInternalState::Open;
                Some(Transition::Opened)
            }
            CircuitInternalState::Closed
            | CircuitInternalState::Open
            | CircuitInternalState::HalfOpen { .. } => None,
        }
    }

    /// Time until the next probe can be admitted; zero when closed.
    pub(super) fn retry_after(&self, now: DateTime<Utc>) -> Duration {
        let since = match self.state {
            CircuitInternalState::Closed => return Duration::ZERO,
            CircuitInternalState::Open => self.last_failure_at,
            CircuitInternalState::HalfOpen { probe_started_at } => Some(probe_started_at),
        };
        let Some(since) = since else {
            return Duration::ZERO;
        };
        let elapsed = (now - since).to_std().unwrap_or(Duration::ZERO);
        self.config.recovery_timeout.saturating_sub(elapsed)
    }

    pub(super) fn threshold_reached(&self) -> bool {
        self.consecutive_failures >= self.config.failure_threshold
    }

    pub(super) fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    pub(super) fn state(&self) -> CircuitState {
        match self.state {
            CircuitInternalState::Closed => CircuitState::Closed,
            CircuitInternalState::Open => CircuitState::Open,
            CircuitInternalState::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub(super) fn snapshot(&self, name: &str) -> CircuitBreakerStats {
        CircuitBreakerStats {
            name: name.to_owned(),
            state: self.state(),
            consecutive_failures: self.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_ms: u64::try_from(self.config.recovery_timeout.as_millis())
                .unwrap_or(u64::MAX),
            last_failure_at: self.last_failure_at,
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            rejected_requests: self.rejected_requests,
        }
    }

    fn recovery_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.last_failure_at {
            Some(last_failure) => {
                elapsed_at_least(last_failure, now, self.config.recovery_timeout)
            }
            None => true,
        }
    }
}

fn elapsed_at_least(since: DateTime<Utc>, now: DateTime<Utc>, timeout: Duration) -> bool {
    // Fail open when std->chrono conversion fails: returning true avoids
    // holding the circuit open forever on an out-of-range timeout.
    let Ok(timeout) = chrono::Duration::from_std(timeout) else {
        return true;
    };

    now >= since + timeout
}
