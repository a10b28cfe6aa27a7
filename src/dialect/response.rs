//! Abstract response model and raw wire request/response carriers.

use serde_json::Value;

use crate::error::ErrorCode;

use super::routes::Verb;

/// A dialect-specific HTTP request, before transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    /// Request verb.
    pub method: Verb,
    /// Path, with template parameters already expanded.
    pub uri: String,
    /// JSON body. `Value::Null` for bodiless requests.
    pub body: Value,
}

impl WireRequest {
    /// Build a request.
    pub fn new(method: Verb, uri: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            uri: uri.into(),
            body,
        }
    }
}

/// A dialect-specific HTTP response, as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body. `Value::Null` when the body was empty.
    pub body: Value,
}

impl WireResponse {
    /// Build a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// HTTP-level success.
    pub fn is_http_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Dialect-neutral command result.
///
/// Built up mutably during decode, then treated as immutable. For errors the
/// `value` holds a normalized descriptor: `message`, optional `stacktrace`,
/// and for unexpected-alert errors the extracted `alert_text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Session the response belongs to, when known.
    pub session_id: Option<String>,
    /// Success or a taxonomy error code.
    pub status: ErrorCode,
    /// Result payload, or the error descriptor.
    pub value: Value,
}

impl Response {
    /// Successful response carrying a payload.
    pub fn success(session_id: Option<String>, value: Value) -> Self {
        Self {
            session_id,
            status: ErrorCode::Success,
            value,
        }
    }

    /// Error response with a message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            session_id: None,
            status: code,
            value: serde_json::json!({ "message": message.into() }),
        }
    }

    /// Error response for a blocking user prompt, preserving the prompt text.
    pub fn alert_error(message: impl Into<String>, alert_text: impl Into<String>) -> Self {
        Self {
            session_id: None,
            status: ErrorCode::UnexpectedAlertOpen,
            value: serde_json::json!({
                "message": message.into(),
                "alert_text": alert_text.into(),
            }),
        }
    }

    /// True when the status is the success code.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Human-readable error state for this response's status, or `None` on
    /// success. Dialect-specific wording is the codec's concern; this is the
    /// W3C name used as the neutral form.
    pub fn state(&self) -> Option<&'static str> {
        if self.is_success() {
            None
        } else {
            Some(self.status.w3c_name())
        }
    }

    /// Error message, when this is an error response.
    pub fn message(&self) -> Option<&str> {
        self.value.get("message").and_then(Value::as_str)
    }

    /// Alert text extracted from an unexpected-alert error.
    pub fn alert_text(&self) -> Option<&str> {
        self.value.get("alert_text").and_then(Value::as_str)
    }
}
