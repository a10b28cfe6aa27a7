//! New-session handshake and dialect detection.
//!
//! Upstream endpoints never reliably declare which dialect they speak, so
//! the handshake sends one request whose body carries both capability
//! shapes, then sniffs the response: an ordered list of pure interpreters is
//! tried against the raw body, and the first one that recognizes its own
//! success or error shape wins. Ordering matters because the legacy and
//! transitional shapes are structurally looser than the W3C ones; stricter
//! shapes go first.

use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::capabilities::{is_accepted_w3c_key, Capabilities};
use crate::dialect::Dialect;
use crate::error::{BridgeError, ErrorCode, Result};

/// Outcome of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Established {
    /// Dialect the upstream turned out to speak.
    pub dialect: Dialect,
    /// Session identity assigned by the upstream.
    pub session_id: String,
    /// Capabilities the upstream reported for the created session.
    pub capabilities: Value,
}

/// What one interpreter made of the response, if anything.
enum Verdict {
    Established(Established),
    Refused(BridgeError),
}

type Interpreter = fn(u16, &Value) -> Option<Verdict>;

/// Interpreters in trial order. Stricter shapes before looser ones: a W3C
/// body is unambiguous, while the legacy and transitional shapes can be
/// subsets of each other.
const INTERPRETERS: &[Interpreter] = &[
    w3c_error,
    w3c_success,
    legacy_error,
    legacy_success,
    transitional_success,
];

/// Detect the dialect of a raw new-session response.
///
/// Pure function of the HTTP status and decoded body; running it twice on
/// the same input yields the same result.
pub fn detect(status: u16, body: &Value) -> Result<Established> {
    for interpreter in INTERPRETERS {
        match interpreter(status, body) {
            Some(Verdict::Established(established)) => return Ok(established),
            Some(Verdict::Refused(error)) => return Err(error),
            None => continue,
        }
    }
    Err(BridgeError::SessionNotCreated(format!(
        "no interpreter recognized the new-session response (HTTP {status})"
    )))
}

fn w3c_error(_status: u16, body: &Value) -> Option<Verdict> {
    let value = body.get("value")?;
    let name = value.get("error")?.as_str()?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(name)
        .to_string();
    Some(Verdict::Refused(BridgeError::UpstreamRefused {
        code: ErrorCode::from_w3c_name(name),
        message,
    }))
}

fn w3c_success(status: u16, body: &Value) -> Option<Verdict> {
    if !(200..300).contains(&status) {
        return None;
    }
    let value = body.get("value")?;
    let session_id = value.get("sessionId")?.as_str()?;
    let capabilities = value.get("capabilities")?;
    if !capabilities.is_object() {
        return None;
    }
    Some(Verdict::Established(Established {
        dialect: Dialect::W3C,
        session_id: session_id.to_string(),
        capabilities: capabilities.clone(),
    }))
}

fn legacy_error(_status: u16, body: &Value) -> Option<Verdict> {
    let status_code = body.get("status")?.as_u64()?;
    if status_code == 0 {
        return None;
    }
    let message = body
        .get("value")
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("upstream reported a new-session failure")
        .to_string();
    Some(Verdict::Refused(BridgeError::UpstreamRefused {
        code: ErrorCode::from_legacy_status(status_code),
        message,
    }))
}

fn legacy_success(_status: u16, body: &Value) -> Option<Verdict> {
    let status_code = body.get("status")?.as_u64()?;
    if status_code != 0 {
        return None;
    }
    let session_id = body.get("sessionId")?.as_str()?;
    Some(Verdict::Established(Established {
        dialect: Dialect::Legacy,
        session_id: session_id.to_string(),
        capabilities: body.get("value").cloned().unwrap_or(Value::Null),
    }))
}

/// Pre-standard geckodriver: top-level `sessionId` next to a capabilities
/// `value`, with no `status` field. Treated as W3C.
fn transitional_success(status: u16, body: &Value) -> Option<Verdict> {
    if !(200..300).contains(&status) || body.get("status").is_some() {
        return None;
    }
    let session_id = body.get("sessionId")?.as_str()?;
    let capabilities = body.get("value")?;
    if !capabilities.is_object() {
        return None;
    }
    Some(Verdict::Established(Established {
        dialect: Dialect::W3C,
        session_id: session_id.to_string(),
        capabilities: capabilities.clone(),
    }))
}

/// The dialect-agnostic new-session body: both a legacy and a W3C shape, so
/// an endpoint of unknown dialect understands at least one of them.
pub fn combined_body(caps: &Capabilities) -> Value {
    json!({
        "desiredCapabilities": caps.as_map(),
        "capabilities": {
            "alwaysMatch": w3c_view(caps),
            "firstMatch": [{}],
        },
    })
}

/// The subset of a capability set a strict W3C endpoint will accept.
fn w3c_view(caps: &Capabilities) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in caps.iter() {
        if value.is_null() {
            continue;
        }
        if key == "platform" {
            out.insert("platformName".to_string(), value.clone());
        } else if key == "version" {
            out.insert("browserVersion".to_string(), value.clone());
        } else if is_accepted_w3c_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

/// Run the handshake against a live endpoint: one POST, then shape
/// detection. Network and decode failures surface as session-not-created
/// carrying the attempted capability set; never retried here.
pub async fn begin_session(
    client: &Client,
    base_url: &str,
    caps: &Capabilities,
) -> Result<Established> {
    let url = format!("{}/session", base_url.trim_end_matches('/'));
    let body = combined_body(caps);
    debug!(%url, "starting new-session handshake");

    let attempted = || serde_json::to_string(caps.as_map()).unwrap_or_default();

    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            BridgeError::SessionNotCreated(format!(
                "new-session request failed: {e} (capabilities: {})",
                attempted()
            ))
        })?;

    let status = response.status().as_u16();
    let body: Value = response.json().await.map_err(|e| {
        BridgeError::SessionNotCreated(format!(
            "new-session response was not JSON: {e} (capabilities: {})",
            attempted()
        ))
    })?;

    let established = detect(status, &body)?;
    debug!(
        dialect = %established.dialect,
        session_id = %established.session_id,
        "handshake complete"
    );
    Ok(established)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_w3c_success_detection() {
        let body = json!({
            "value": {"sessionId": "42", "capabilities": {"browserName": "chrome"}}
        });
        let established = detect(200, &body).unwrap();
        assert_eq!(established.dialect, Dialect::W3C);
        assert_eq!(established.session_id, "42");
        assert_eq!(established.capabilities["browserName"], json!("chrome"));
    }

    #[test]
    fn test_legacy_success_detection() {
        let body = json!({
            "status": 0, "sessionId": "7", "value": {"browserName": "firefox"}
        });
        let established = detect(200, &body).unwrap();
        assert_eq!(established.dialect, Dialect::Legacy);
        assert_eq!(established.session_id, "7");
    }

    #[test]
    fn test_detection_is_deterministic() {
        let body = json!({
            "value": {"sessionId": "42", "capabilities": {}}
        });
        assert_eq!(detect(200, &body).unwrap(), detect(200, &body).unwrap());
    }

    #[test]
    fn test_w3c_error_beats_legacy_interpretation() {
        // A body carrying both an error envelope and a status field must hit
        // the W3C error interpreter first.
        let body = json!({
            "status": 33,
            "value": {"error": "session not created", "message": "nope"}
        });
        match detect(500, &body) {
            Err(BridgeError::UpstreamRefused { code, message }) => {
                assert_eq!(code, ErrorCode::SessionNotCreated);
                assert_eq!(message, "nope");
            },
            other => panic!("expected UpstreamRefused, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_error_detection() {
        let body = json!({"status": 13, "value": {"message": "driver exploded"}});
        match detect(500, &body) {
            Err(BridgeError::UpstreamRefused { code, .. }) => {
                assert_eq!(code, ErrorCode::UnknownError);
            },
            other => panic!("expected UpstreamRefused, got {other:?}"),
        }
    }

    #[test]
    fn test_transitional_geckodriver_shape() {
        let body = json!({
            "sessionId": "g1",
            "value": {"browserName": "firefox", "moz:profile": "/tmp/x"}
        });
        let established = detect(200, &body).unwrap();
        assert_eq!(established.dialect, Dialect::W3C);
        assert_eq!(established.session_id, "g1");
    }

    #[test]
    fn test_unrecognized_shape_fails() {
        let body = json!({"hello": "world"});
        assert!(matches!(
            detect(200, &body),
            Err(BridgeError::SessionNotCreated(_))
        ));
    }

    #[test]
    fn test_combined_body_carries_both_shapes() {
        let caps = Capabilities::new(
            json!({"browserName": "chrome", "platform": "LINUX", "takesScreenshot": true})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let body = combined_body(&caps);
        assert_eq!(body["desiredCapabilities"]["platform"], json!("LINUX"));
        // The W3C section is filtered and renamed.
        let always = &body["capabilities"]["alwaysMatch"];
        assert_eq!(always["platformName"], json!("LINUX"));
        assert!(always.get("takesScreenshot").is_none());
    }
}
