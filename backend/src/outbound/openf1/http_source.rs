//! Reqwest-backed telemetry source adapter.
//!
//! This adapter owns transport details only: URL and query construction,
//! the request timeout, HTTP status mapping and JSON array decoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::domain::ports::{UpstreamSource, UpstreamSourceError};
use crate::domain::{DataCategory, FetchParams};

const DEFAULT_USER_AGENT: &str = concat!("paddock/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the upstream telemetry API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenF1HttpConfig {
    /// API root, e.g. `https://api.openf1.org/v1/`.
    pub base_url: Url,
    /// Per-request deadline; exceeding it is a breaker failure.
    pub timeout: Duration,
    /// HTTP user-agent sent upstream.
    pub user_agent: String,
}

impl OpenF1HttpConfig {
    /// Settings with a 10 s timeout and the crate user-agent.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// Upstream source performing `GET <base>/<category>?<params>` requests.
pub struct OpenF1HttpSource {
    client: Client,
    base_url: Url,
}

impl OpenF1HttpSource {
    /// Build an adapter using a reqwest client with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: OpenF1HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(config.base_url),
        })
    }

    fn endpoint_for(&self, category: DataCategory) -> Result<Url, UpstreamSourceError> {
        self.base_url.join(category.as_str()).map_err(|error| {
            UpstreamSourceError::invalid_request(format!(
                "cannot build URL for {category}: {error}"
            ))
        })
    }
}

#[async_trait]
impl UpstreamSource for OpenF1HttpSource {
    async fn fetch(
        &self,
        category: DataCategory,
        params: &FetchParams,
    ) -> Result<Vec<Value>, UpstreamSourceError> {
        let endpoint = self.endpoint_for(category)?;
        debug!(%category, url = %endpoint, "requesting upstream records");
        let response = self
            .client
            .get(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&params.query_pairs())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_records(body.as_ref())
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_records(body: &[u8]) -> Result<Vec<Value>, UpstreamSourceError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(other) => Err(UpstreamSourceError::decode(format!(
            "expected a JSON array, got: {}",
            body_preview(other.to_string().as_bytes())
        ))),
        Err(error) => Err(UpstreamSourceError::decode(format!(
            "invalid JSON payload: {error}"
        ))),
    }
}

fn map_transport_error(error: reqwest::Error) -> UpstreamSourceError {
    if error.is_timeout() {
        UpstreamSourceError::timeout(error.to_string())
    } else {
        UpstreamSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> UpstreamSourceError {
    let body_preview = body_preview(body);
    let detail = if body_preview.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_owned()
    } else {
        body_preview
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            UpstreamSourceError::timeout(format!("status {}: {detail}", status.as_u16()))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            UpstreamSourceError::status(status.as_u16(), format!("rate limited: {detail}"))
        }
        _ => UpstreamSourceError::status(status.as_u16(), detail),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
