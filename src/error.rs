//! Bridge error types and the WebDriver wire-level error vocabulary.
//!
//! Errors fall into two layers:
//!
//! - [`BridgeError`]: what library code returns through `Result`. Covers the
//!   taxonomy from payload validation through session lookup.
//! - [`ErrorCode`]: the closed wire vocabulary both dialects render from.
//!   Every `BridgeError` resolves to exactly one `ErrorCode` so clients see
//!   a consistent set of status codes regardless of which component failed.

use thiserror::Error;

/// Bridge errors.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Malformed, overlapping, or illegally-keyed capability document.
    /// Detected before any network call.
    #[error("Invalid capabilities: {0}")]
    InvalidCapabilities(String),

    /// No interpreter recognized the upstream new-session response, or every
    /// candidate/backend pairing was exhausted.
    #[error("Session not created: {0}")]
    SessionNotCreated(String),

    /// The upstream endpoint reported a dialect-specific error during
    /// session creation.
    #[error("Upstream refused session: {code:?}: {message}")]
    UpstreamRefused {
        /// Wire-level code reported by the upstream.
        code: ErrorCode,
        /// Human-readable message from the upstream.
        message: String,
    },

    /// A response that should have matched the negotiated dialect failed to
    /// decode. Not retried; propagates as the command's result.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Command name has no entry in a dialect's routing table.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Command addressed to an evicted or never-existent session id.
    /// Distinguished from [`BridgeError::Protocol`] so callers can stop
    /// polling a dead session.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Per-command timeout expired while waiting on the upstream.
    #[error("Command timed out after {0:?}")]
    CommandTimeout(std::time::Duration),

    /// Network communication error.
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (payload spillover store).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        BridgeError::Network(err.to_string())
    }
}

impl From<toml::de::Error> for BridgeError {
    fn from(err: toml::de::Error) -> Self {
        BridgeError::Config(err.to_string())
    }
}

impl BridgeError {
    /// Resolve to the wire-level code used when rendering an error envelope.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            BridgeError::InvalidCapabilities(_) => ErrorCode::InvalidArgument,
            BridgeError::SessionNotCreated(_) => ErrorCode::SessionNotCreated,
            BridgeError::UpstreamRefused { code, .. } => *code,
            BridgeError::Protocol(_) | BridgeError::Json(_) | BridgeError::Io(_) => {
                ErrorCode::UnknownError
            },
            BridgeError::UnknownCommand(_) => ErrorCode::UnknownCommand,
            BridgeError::SessionNotFound(_) => ErrorCode::InvalidSessionId,
            BridgeError::CommandTimeout(_) => ErrorCode::Timeout,
            BridgeError::Network(_) => ErrorCode::UnknownError,
            BridgeError::Config(_) => ErrorCode::UnknownError,
        }
    }
}

/// Closed wire-level error vocabulary.
///
/// Each code carries its legacy numeric status, its W3C error name, and the
/// HTTP status the W3C dialect pairs with it. Both response codecs render
/// from this single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Command completed without error (legacy status 0).
    Success,
    /// No session matching the given id.
    InvalidSessionId,
    /// Element lookup returned nothing.
    NoSuchElement,
    /// Frame lookup returned nothing.
    NoSuchFrame,
    /// Command not mapped in the routing table.
    UnknownCommand,
    /// Element reference no longer attached to the document.
    StaleElementReference,
    /// Element cannot be interacted with.
    ElementNotInteractable,
    /// Element is in a state that forbids the operation.
    InvalidElementState,
    /// Unclassified server-side failure.
    UnknownError,
    /// Injected script raised.
    JavascriptError,
    /// Command did not complete in time.
    Timeout,
    /// Window lookup returned nothing.
    NoSuchWindow,
    /// Cookie domain does not match the current document.
    InvalidCookieDomain,
    /// Cookie could not be set.
    UnableToSetCookie,
    /// A user prompt blocked the command.
    UnexpectedAlertOpen,
    /// No user prompt to operate on.
    NoSuchAlert,
    /// Asynchronous script did not complete in time.
    ScriptTimeout,
    /// Element locator could not be compiled.
    InvalidSelector,
    /// No backend produced a session.
    SessionNotCreated,
    /// Pointer move target outside the viewport.
    MoveTargetOutOfBounds,
    /// Malformed command arguments.
    InvalidArgument,
    /// Command recognized but not supported by the endpoint.
    UnsupportedOperation,
}

impl ErrorCode {
    /// Legacy numeric status code.
    pub fn legacy_status(self) -> u64 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::InvalidSessionId => 6,
            ErrorCode::NoSuchElement => 7,
            ErrorCode::NoSuchFrame => 8,
            ErrorCode::UnknownCommand => 9,
            ErrorCode::StaleElementReference => 10,
            ErrorCode::ElementNotInteractable => 11,
            ErrorCode::InvalidElementState => 12,
            ErrorCode::UnknownError => 13,
            ErrorCode::JavascriptError => 17,
            ErrorCode::Timeout => 21,
            ErrorCode::NoSuchWindow => 23,
            ErrorCode::InvalidCookieDomain => 24,
            ErrorCode::UnableToSetCookie => 25,
            ErrorCode::UnexpectedAlertOpen => 26,
            ErrorCode::NoSuchAlert => 27,
            ErrorCode::ScriptTimeout => 28,
            ErrorCode::InvalidSelector => 32,
            ErrorCode::SessionNotCreated => 33,
            ErrorCode::MoveTargetOutOfBounds => 34,
            ErrorCode::InvalidArgument => 61,
            ErrorCode::UnsupportedOperation => 13,
        }
    }

    /// W3C error name (the `error` field of a W3C error envelope).
    pub fn w3c_name(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::InvalidSessionId => "invalid session id",
            ErrorCode::NoSuchElement => "no such element",
            ErrorCode::NoSuchFrame => "no such frame",
            ErrorCode::UnknownCommand => "unknown command",
            ErrorCode::StaleElementReference => "stale element reference",
            ErrorCode::ElementNotInteractable => "element not interactable",
            ErrorCode::InvalidElementState => "invalid element state",
            ErrorCode::UnknownError => "unknown error",
            ErrorCode::JavascriptError => "javascript error",
            ErrorCode::Timeout => "timeout",
            ErrorCode::NoSuchWindow => "no such window",
            ErrorCode::InvalidCookieDomain => "invalid cookie domain",
            ErrorCode::UnableToSetCookie => "unable to set cookie",
            ErrorCode::UnexpectedAlertOpen => "unexpected alert open",
            ErrorCode::NoSuchAlert => "no such alert",
            ErrorCode::ScriptTimeout => "script timeout",
            ErrorCode::InvalidSelector => "invalid selector",
            ErrorCode::SessionNotCreated => "session not created",
            ErrorCode::MoveTargetOutOfBounds => "move target out of bounds",
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::UnsupportedOperation => "unsupported operation",
        }
    }

    /// HTTP status the W3C dialect pairs with this code.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::Success => 200,
            ErrorCode::InvalidSessionId
            | ErrorCode::NoSuchElement
            | ErrorCode::NoSuchFrame
            | ErrorCode::UnknownCommand
            | ErrorCode::StaleElementReference
            | ErrorCode::NoSuchWindow
            | ErrorCode::NoSuchAlert => 404,
            ErrorCode::ElementNotInteractable
            | ErrorCode::InvalidElementState
            | ErrorCode::InvalidCookieDomain
            | ErrorCode::InvalidSelector
            | ErrorCode::InvalidArgument => 400,
            ErrorCode::UnknownError
            | ErrorCode::JavascriptError
            | ErrorCode::Timeout
            | ErrorCode::UnableToSetCookie
            | ErrorCode::UnexpectedAlertOpen
            | ErrorCode::ScriptTimeout
            | ErrorCode::SessionNotCreated
            | ErrorCode::MoveTargetOutOfBounds
            | ErrorCode::UnsupportedOperation => 500,
        }
    }

    /// Look up a code from a legacy numeric status. Unknown numbers map to
    /// [`ErrorCode::UnknownError`] so legacy endpoints with private codes
    /// still produce a renderable envelope.
    pub fn from_legacy_status(status: u64) -> ErrorCode {
        match status {
            0 => ErrorCode::Success,
            6 => ErrorCode::InvalidSessionId,
            7 => ErrorCode::NoSuchElement,
            8 => ErrorCode::NoSuchFrame,
            9 => ErrorCode::UnknownCommand,
            10 => ErrorCode::StaleElementReference,
            11 => ErrorCode::ElementNotInteractable,
            12 => ErrorCode::InvalidElementState,
            17 => ErrorCode::JavascriptError,
            21 => ErrorCode::Timeout,
            23 => ErrorCode::NoSuchWindow,
            24 => ErrorCode::InvalidCookieDomain,
            25 => ErrorCode::UnableToSetCookie,
            26 => ErrorCode::UnexpectedAlertOpen,
            27 => ErrorCode::NoSuchAlert,
            28 => ErrorCode::ScriptTimeout,
            32 => ErrorCode::InvalidSelector,
            33 => ErrorCode::SessionNotCreated,
            34 => ErrorCode::MoveTargetOutOfBounds,
            61 => ErrorCode::InvalidArgument,
            _ => ErrorCode::UnknownError,
        }
    }

    /// Look up a code from a W3C error name.
    pub fn from_w3c_name(name: &str) -> ErrorCode {
        match name {
            "invalid session id" => ErrorCode::InvalidSessionId,
            "no such element" => ErrorCode::NoSuchElement,
            "no such frame" => ErrorCode::NoSuchFrame,
            "unknown command" | "unknown method" => ErrorCode::UnknownCommand,
            "stale element reference" => ErrorCode::StaleElementReference,
            "element not interactable" | "element not visible" => {
                ErrorCode::ElementNotInteractable
            },
            "invalid element state" => ErrorCode::InvalidElementState,
            "javascript error" => ErrorCode::JavascriptError,
            "timeout" => ErrorCode::Timeout,
            "no such window" => ErrorCode::NoSuchWindow,
            "invalid cookie domain" => ErrorCode::InvalidCookieDomain,
            "unable to set cookie" => ErrorCode::UnableToSetCookie,
            "unexpected alert open" => ErrorCode::UnexpectedAlertOpen,
            "no such alert" => ErrorCode::NoSuchAlert,
            "script timeout" => ErrorCode::ScriptTimeout,
            "invalid selector" => ErrorCode::InvalidSelector,
            "session not created" => ErrorCode::SessionNotCreated,
            "move target out of bounds" => ErrorCode::MoveTargetOutOfBounds,
            "invalid argument" => ErrorCode::InvalidArgument,
            "unsupported operation" => ErrorCode::UnsupportedOperation,
            _ => ErrorCode::UnknownError,
        }
    }

    /// True for the success code.
    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_round_trip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::NoSuchElement,
            ErrorCode::Timeout,
            ErrorCode::SessionNotCreated,
            ErrorCode::InvalidArgument,
        ] {
            assert_eq!(ErrorCode::from_legacy_status(code.legacy_status()), code);
        }
    }

    #[test]
    fn test_w3c_round_trip() {
        for code in [
            ErrorCode::InvalidSessionId,
            ErrorCode::UnexpectedAlertOpen,
            ErrorCode::InvalidSelector,
            ErrorCode::UnsupportedOperation,
        ] {
            assert_eq!(ErrorCode::from_w3c_name(code.w3c_name()), code);
        }
    }

    #[test]
    fn test_unknown_inputs_map_to_unknown_error() {
        assert_eq!(ErrorCode::from_legacy_status(999), ErrorCode::UnknownError);
        assert_eq!(
            ErrorCode::from_w3c_name("no such vibe"),
            ErrorCode::UnknownError
        );
    }

    #[test]
    fn test_error_code_resolution() {
        let err = BridgeError::SessionNotFound("abc".into());
        assert_eq!(err.error_code(), ErrorCode::InvalidSessionId);
        assert_eq!(err.error_code().http_status(), 404);

        let err = BridgeError::InvalidCapabilities("overlap".into());
        assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
    }
}
