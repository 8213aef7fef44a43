use reqwest::StatusCode;
use thiserror::Error;

/// Fallback text when a rejection carries no usable message.
const GENERIC_REJECTION: &str = "an unexpected error occurred";

/// Classified failure of a remote call.
///
/// Every transport failure is folded into this closed set before it
/// reaches the session controller; nothing is silently swallowed and no
/// raw `reqwest` error escapes the crate. The `Display` strings are the
/// human-readable texts the controller narrates into the transcript.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The request exceeded the fixed deadline.
    #[error("request timed out, please try again")]
    Timeout,

    /// No response was received at all (connectivity or policy rejection).
    #[error("network error, the verification service could not be reached")]
    Unreachable,

    /// The service answered with a 5xx status.
    #[error("server error, please try again later")]
    ServerFault,

    /// The endpoint does not exist (404).
    #[error("API endpoint not found, check the service configuration")]
    NotFound,

    /// Any other rejection: 4xx statuses, `success: false` payloads,
    /// or malformed responses. Carries the service-provided message
    /// when one is present.
    #[error("{0}")]
    Rejected(String),
}

impl TransportError {
    /// Classifies a non-success HTTP status, with an optional message
    /// extracted from the response body.
    #[must_use]
    pub fn from_status(status: StatusCode, detail: Option<String>) -> Self {
        if status == StatusCode::NOT_FOUND {
            return Self::NotFound;
        }
        if status.is_server_error() {
            return Self::ServerFault;
        }
        Self::Rejected(detail.unwrap_or_else(|| GENERIC_REJECTION.to_string()))
    }

    /// Builds a rejection from a raw error-response body, preferring the
    /// service's own `message`/`error` fields.
    #[must_use]
    pub fn rejected_from_body(body: &str) -> Self {
        Self::Rejected(extract_service_message(body).unwrap_or_else(|| GENERIC_REJECTION.to_string()))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = err.status() {
            return Self::from_status(status, None);
        }
        Self::Unreachable
    }
}

/// Pulls the `message` or `error` string out of a JSON error body.
fn extract_service_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
