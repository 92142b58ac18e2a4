//! HTTP rendering of domain errors.
//!
//! Handlers return [`ApiResult`]; this module turns the domain [`Error`] into
//! a status code, a JSON body and the headers clients need to react:
//! `trace-id` for correlation and, for 503 responses carrying a retry hint
//! (open breaker, rate-limited upstream), `Retry-After`. Unavailable
//! responses are never cacheable so a recovered upstream is seen at once.

use actix_web::http::header::{CACHE_CONTROL, CacheControl, CacheDirective, RETRY_AFTER};
use actix_web::{HttpResponse, HttpResponseBuilder, ResponseError, http::StatusCode};
use tracing::{error, warn};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `Retry-After` seconds for an unavailable response, at least one.
fn retry_after(error: &Error) -> Option<u64> {
    match error.code() {
        ErrorCode::ServiceUnavailable => error.retry_after_secs().map(|secs| secs.max(1)),
        _ => None,
    }
}

fn unavailable_reason(error: &Error) -> &str {
    error
        .details()
        .and_then(|details| details.get("reason"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unspecified")
}

fn redact_if_internal(error: &Error) -> Error {
    if matches!(error.code(), ErrorCode::InternalError) {
        let mut redacted = Error::internal("Internal server error");
        if let Some(id) = error.trace_id() {
            redacted = redacted.with_trace_id(id.to_owned());
        }
        redacted
    } else {
        error.clone()
    }
}

fn insert_unavailable_headers(builder: &mut HttpResponseBuilder, error: &Error) {
    builder.insert_header(CacheControl(vec![CacheDirective::NoStore]));
    if let Some(secs) = retry_after(error) {
        builder.insert_header((RETRY_AFTER, secs.to_string()));
    }
    warn!(
        reason = unavailable_reason(error),
        retry_after_secs = retry_after(error),
        trace_id = error.trace_id(),
        "responding service unavailable"
    );
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        match self.code() {
            ErrorCode::ServiceUnavailable => insert_unavailable_headers(&mut builder, self),
            ErrorCode::InternalError => {
                builder.insert_header((CACHE_CONTROL, "no-store"));
                error!(message = self.message(), trace_id = self.trace_id(), "internal error");
            }
            _ => {}
        }

        builder.json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}
