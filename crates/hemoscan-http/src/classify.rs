//! Transport-boundary failure classification
//!
//! Every way a request can go wrong is mapped to an [`OperationFailure`] here,
//! once. Nothing past this module looks at reqwest errors or raw bodies.
//!
//! | Signal | Class |
//! |---|---|
//! | connect error, timeout, send or body read failure | Retryable |
//! | 408, 429, 5xx | Retryable |
//! | other 4xx | Fatal, with the body's `detail` |
//! | success status with an undecodable body | Fatal |

use hemoscan_resilience::{FailureClass, OperationFailure};
use reqwest::StatusCode;
use serde_json::Value;

/// Classify an HTTP error status
pub fn classify_status(status: StatusCode) -> FailureClass {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => FailureClass::Retryable,
        s if s.is_server_error() => FailureClass::Retryable,
        _ => FailureClass::Fatal,
    }
}

/// Classify a reqwest error raised before a usable response existed
pub fn classify_transport_error(error: &reqwest::Error) -> OperationFailure {
    let failure = if error.is_timeout() {
        OperationFailure::retryable(format!("request timed out: {error}"))
    } else if error.is_connect() {
        OperationFailure::retryable(format!("could not connect to the server: {error}"))
    } else if error.is_decode() {
        OperationFailure::fatal(format!("unexpected response from the server: {error}"))
    } else if error.is_builder() || error.is_redirect() {
        OperationFailure::fatal(format!("request could not be made: {error}"))
    } else {
        // Send failures and bodies cut off mid-read
        OperationFailure::retryable(error.to_string())
    };

    match error.status() {
        Some(status) => failure.with_status(status.as_u16()),
        None => failure,
    }
}

/// Classify a non-success response from its status and body
pub fn classify_response(status: StatusCode, body: &str) -> OperationFailure {
    let message = extract_detail(body).unwrap_or_else(|| {
        format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("error")
        )
    });

    let failure = match classify_status(status) {
        FailureClass::Retryable => OperationFailure::retryable(message),
        FailureClass::Fatal => OperationFailure::fatal(message),
    };
    failure.with_status(status.as_u16())
}

/// Pull the human-readable `detail` out of an error body
///
/// Accepts a plain string `detail`, or a list of validation entries whose
/// `msg` fields are joined.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

/// Read a failed response's body and classify it
pub(crate) async fn failure_from_response(response: reqwest::Response) -> OperationFailure {
    let status = response.status();
    // An unreadable error body still leaves the status to classify on
    let body = response.text().await.unwrap_or_default();
    classify_response(status, &body)
}
