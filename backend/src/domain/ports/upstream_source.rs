//! Driven port for fetching raw records from the telemetry API.
//!
//! The domain owns the request shape (category plus [`FetchParams`]) so the
//! proxy and preload orchestration stay adapter-agnostic. Records are kept as
//! raw JSON objects; reshaping happens in the decoder.

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;
use crate::domain::{DataCategory, FetchParams};

define_port_error! {
    /// Errors surfaced while calling the upstream API.
    pub enum UpstreamSourceError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "upstream transport failed: {message}",
        /// The call exceeded its deadline.
        Timeout { message: String } =>
            "upstream timeout: {message}",
        /// The upstream answered with a non-success status.
        Status { status: u16, message: String } =>
            "upstream returned status {status}: {message}",
        /// The response body was not a JSON array of records.
        Decode { message: String } =>
            "upstream response decode failed: {message}",
        /// The adapter rejected the request before execution.
        InvalidRequest { message: String } =>
            "upstream request invalid: {message}",
    }
}

impl UpstreamSourceError {
    /// Whether the upstream signalled rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }
}

/// Port for reading one category of upstream records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Fetch all records of `category` matching `params`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use paddock::domain::ports::{FixtureUpstreamSource, UpstreamSource};
    /// use paddock::domain::{DataCategory, FetchParams, SessionKey};
    ///
    /// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
    /// let source = FixtureUpstreamSource;
    /// let records = source
    ///     .fetch(DataCategory::Laps, &FetchParams::for_session(SessionKey::new(9158)))
    ///     .await?;
    /// assert!(records.is_empty());
    /// # Ok::<(), paddock::domain::ports::UpstreamSourceError>(())
    /// # }).unwrap();
    /// ```
    async fn fetch(
        &self,
        category: DataCategory,
        params: &FetchParams,
    ) -> Result<Vec<Value>, UpstreamSourceError>;
}

/// Fixture implementation returning no records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureUpstreamSource;

#[async_trait]
impl UpstreamSource for FixtureUpstreamSource {
    async fn fetch(
        &self,
        _category: DataCategory,
        _params: &FetchParams,
    ) -> Result<Vec<Value>, UpstreamSourceError> {
        Ok(Vec::new())
    }
}
