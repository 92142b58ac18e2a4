//! Domain-level error type.
//!
//! Errors are transport agnostic. The HTTP adapter maps them to status codes
//! and JSON envelopes; the domain only decides the category and message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::TraceId;

/// Response header carrying the request trace identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// `details` key holding a retry hint in whole seconds.
pub const RETRY_AFTER_DETAIL: &str = "retryAfterSecs";

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The requested resource does not exist.
    NotFound,
    /// A dependency is unavailable (upstream failure or open circuit).
    ServiceUnavailable,
    /// An unexpected error occurred inside the service.
    InternalError,
}

impl ErrorCode {
    const fn fallback_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "Invalid request",
            Self::NotFound => "Not found",
            Self::ServiceUnavailable => "Service unavailable",
            Self::InternalError => "Internal server error",
        }
    }
}

/// Validation errors emitted by the fallible constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    /// The message was blank.
    #[error("error message must not be empty")]
    EmptyMessage,
    /// The trace identifier was blank.
    #[error("trace identifier must not be empty")]
    EmptyTraceId,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` is non-empty once trimmed of whitespace.
/// - `trace_id`, when present, is non-empty.
///
/// # Examples
/// ```
/// use paddock::domain::{Error, ErrorCode};
///
/// let err = Error::service_unavailable("upstream is down");
/// assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
/// assert_eq!(err.message(), "upstream is down");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    #[schema(example = "service_unavailable")]
    code: ErrorCode,
    #[schema(example = "upstream telemetry API unavailable")]
    message: String,
    #[schema(example = "01HZY8B2W6X5Y7Z9ABCD1234")]
    trace_id: Option<String>,
    details: Option<Value>,
}

impl Error {
    /// Create an error, capturing the trace identifier in scope.
    ///
    /// A blank message is replaced by a generic message for `code`.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::try_new(code, message).unwrap_or_else(|_| Self {
            code,
            message: code.fallback_message().to_owned(),
            trace_id: current_trace_id(),
            details: None,
        })
    }

    /// Fallible constructor that validates the message content.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorValidationError::EmptyMessage`] for blank messages.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            trace_id: current_trace_id(),
            details: None,
        })
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Correlation identifier, if one was captured.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Supplementary structured details.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach a trace identifier. Blank values are ignored.
    pub fn with_trace_id(self, id: impl Into<String>) -> Self {
        let fallback = self.clone();
        self.try_with_trace_id(id).unwrap_or(fallback)
    }

    /// Attach a trace identifier, rejecting blank values.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorValidationError::EmptyTraceId`] for blank identifiers.
    pub fn try_with_trace_id(
        mut self,
        id: impl Into<String>,
    ) -> Result<Self, ErrorValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ErrorValidationError::EmptyTraceId);
        }
        self.trace_id = Some(id);
        Ok(self)
    }

    /// Attach structured details.
    ///
    /// # Examples
    /// ```
    /// use paddock::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("bad").with_details(json!({ "field": "category" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Retry hint in whole seconds, read from [`RETRY_AFTER_DETAIL`].
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.details.as_ref()?.get(RETRY_AFTER_DETAIL)?.as_u64()
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

fn current_trace_id() -> Option<String> {
    TraceId::current().map(|id| id.to_string())
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(alias = "trace_id")]
    trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            trace_id: value.trace_id,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            trace_id,
            details,
        } = value;

        let message = message.trim().to_owned();
        if message.is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        let trace_id = match trace_id {
            Some(id) if id.trim().is_empty() => return Err(ErrorValidationError::EmptyTraceId),
            other => other,
        };
        Ok(Self {
            code,
            message,
            trace_id,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Construction, validation and serialisation of domain errors.
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use uuid::Uuid;

    const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

    #[fixture]
    fn base_error() -> Error {
        Error::invalid_request("bad")
    }

    #[rstest]
    fn service_unavailable_constructor_sets_code() {
        let err = Error::service_unavailable("upstream down");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    fn try_new_rejects_empty_messages() {
        let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
        assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
    }

    #[rstest]
    fn new_substitutes_generic_message_for_blank_input() {
        let err = Error::new(ErrorCode::ServiceUnavailable, "");
        assert_eq!(err.message(), "Service unavailable");
    }

    #[rstest]
    fn try_with_trace_id_rejects_empty_values(base_error: Error) {
        let result = base_error.try_with_trace_id("   ");
        assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
    }

    #[rstest]
    fn with_trace_id_ignores_blank_values(base_error: Error) {
        assert_eq!(base_error.with_trace_id(" ").trace_id(), None);
    }

    #[rstest]
    fn new_returns_none_when_trace_id_out_of_scope() {
        assert!(Error::internal("boom").trace_id().is_none());
    }

    #[tokio::test]
    async fn new_captures_trace_id_in_scope() {
        let trace_id = TraceId::from_uuid(Uuid::nil());
        let err = TraceId::scope(trace_id, async { Error::internal("boom") }).await;
        assert_eq!(err.trace_id(), Some(TRACE_ID));
    }

    #[rstest]
    fn serialises_camel_case_and_skips_absent_fields(base_error: Error) {
        let value = serde_json::to_value(base_error.with_trace_id(TRACE_ID)).expect("serialise");
        assert_eq!(
            value,
            json!({"code": "invalid_request", "message": "bad", "traceId": TRACE_ID})
        );
    }

    #[rstest]
    fn deserialisation_validates_message() {
        let result = serde_json::from_value::<Error>(json!({
            "code": "not_found",
            "message": "  ",
        }));
        assert!(result.is_err());
    }

    #[rstest]
    fn deserialisation_accepts_snake_case_trace_id() {
        let err: Error = serde_json::from_value(json!({
            "code": "service_unavailable",
            "message": "down",
            "trace_id": TRACE_ID,
        }))
        .expect("valid payload");
        assert_eq!(err.trace_id(), Some(TRACE_ID));
    }
}
