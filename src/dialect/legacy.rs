//! Legacy (JSON wire protocol) codecs.
//!
//! The legacy dialect has a native endpoint for every command kind, so
//! encoding is routing-table expansion plus a small number of body shape
//! fixups. Responses carry a numeric `status` field; `0` is success.

use serde_json::{json, Map, Value};

use crate::error::{BridgeError, ErrorCode, Result};

use super::command::{Command, CommandKind};
use super::response::{Response, WireRequest, WireResponse};
use super::routes::{expand_template, legacy_route, match_template, Verb};
use super::{CommandCodec, ResponseCodec};

/// Command codec for the legacy dialect.
pub struct LegacyCommandCodec;

impl CommandCodec for LegacyCommandCodec {
    fn encode(&self, command: &Command) -> Result<WireRequest> {
        let route = legacy_route(command.kind);
        let (uri, consumed) = expand_route(route.template, command)?;

        let body = match route.method {
            Verb::Get | Verb::Delete => Value::Null,
            Verb::Post => match command.kind {
                // The wire form carries keystrokes as a list whose
                // concatenation is the text.
                CommandKind::SendKeysToElement | CommandKind::SendKeysToActiveElement => {
                    let text = command.param_str("text").unwrap_or_default();
                    json!({ "value": [text] })
                },
                _ => Value::Object(remaining_params(command, &consumed)),
            },
        };

        Ok(WireRequest::new(route.method, uri, body))
    }

    fn decode(&self, request: &WireRequest) -> Result<Command> {
        for kind in CommandKind::ALL {
            let route = legacy_route(*kind);
            if route.method != request.method {
                continue;
            }
            let Some(captures) = match_template(route.template, &request.uri) else {
                continue;
            };

            let mut command = Command::new(*kind);
            let mut parameters = Map::new();
            for (param, value) in captures {
                if param == "sessionId" {
                    command.session_id = Some(value.to_string());
                } else {
                    parameters.insert(param.to_string(), Value::String(value.to_string()));
                }
            }

            match kind {
                CommandKind::SendKeysToElement | CommandKind::SendKeysToActiveElement => {
                    parameters.insert("text".to_string(), Value::String(joined_keys(&request.body)));
                },
                _ => {
                    if let Value::Object(body) = &request.body {
                        for (k, v) in body {
                            parameters.insert(k.clone(), v.clone());
                        }
                    }
                },
            }

            command.parameters = parameters;
            return Ok(command);
        }

        Err(BridgeError::UnknownCommand(format!(
            "{:?} {}",
            request.method, request.uri
        )))
    }
}

/// Response codec for the legacy dialect.
pub struct LegacyResponseCodec;

impl ResponseCodec for LegacyResponseCodec {
    fn encode(&self, response: &Response) -> Result<WireResponse> {
        let mut body = Map::new();
        if let Some(id) = &response.session_id {
            body.insert("sessionId".to_string(), Value::String(id.clone()));
        }
        body.insert(
            "status".to_string(),
            Value::from(response.status.legacy_status()),
        );

        if response.is_success() {
            body.insert("value".to_string(), response.value.clone());
            return Ok(WireResponse::new(200, Value::Object(body)));
        }

        let mut error = Map::new();
        error.insert(
            "message".to_string(),
            Value::String(response.message().unwrap_or("").to_string()),
        );
        if let Some(text) = response.alert_text() {
            error.insert("alert".to_string(), json!({ "text": text }));
        }
        if let Some(trace) = response.value.get("stacktrace") {
            error.insert("stackTrace".to_string(), trace.clone());
        }
        body.insert("value".to_string(), Value::Object(error));

        Ok(WireResponse::new(500, Value::Object(body)))
    }

    fn decode(&self, wire: &WireResponse) -> Result<Response> {
        // Shape 1: status envelope, success or error.
        if let Some(status) = wire.body.get("status").and_then(Value::as_u64) {
            let session_id = wire
                .body
                .get("sessionId")
                .and_then(Value::as_str)
                .map(str::to_string);
            let value = wire.body.get("value").cloned().unwrap_or(Value::Null);

            let code = ErrorCode::from_legacy_status(status);
            if code.is_success() {
                return Ok(Response::success(session_id, value));
            }

            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let mut response = if code == ErrorCode::UnexpectedAlertOpen {
                Response::alert_error(message, extract_alert_text(&value).unwrap_or_default())
            } else {
                Response::error(code, message)
            };
            response.session_id = session_id;
            return Ok(response);
        }

        // Shape 2: HTTP success with a bare body.
        if wire.is_http_success() {
            return Ok(Response::success(None, wire.body.clone()));
        }

        // Shape 3: HTTP failure carrying an error object (or nothing usable).
        let message = wire
            .body
            .get("value")
            .and_then(|v| v.get("message"))
            .or_else(|| wire.body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("upstream returned an undecodable error")
            .to_string();
        Ok(Response::error(ErrorCode::UnknownError, message))
    }
}

/// Expand a route template from the command, returning the URI and the set
/// of parameter names consumed by the URL.
fn expand_route(template: &'static str, command: &Command) -> Result<(String, Vec<&'static str>)> {
    let mut consumed = Vec::new();
    let uri = expand_template(template, |param| {
        if param == "sessionId" {
            command.session_id.as_deref()
        } else {
            let value = command.param_str(param);
            if value.is_some() {
                consumed.push(param);
            }
            value
        }
    })
    .ok_or_else(|| {
        BridgeError::Protocol(format!(
            "missing URL parameter for {} ({template})",
            command.kind.name()
        ))
    })?;
    Ok((uri, consumed))
}

/// Parameters not already carried in the URL.
fn remaining_params(command: &Command, consumed: &[&str]) -> Map<String, Value> {
    command
        .parameters
        .iter()
        .filter(|(k, _)| !consumed.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Concatenate a legacy `value` keystroke list back into text.
fn joined_keys(body: &Value) -> String {
    body.get("value")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Alert text lives under `value.alert.text` or the older `value.alertText`.
fn extract_alert_text(value: &Value) -> Option<String> {
    value
        .get("alert")
        .and_then(|a| a.get("text"))
        .or_else(|| value.get("alertText"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(command: &Command) {
        let wire = LegacyCommandCodec.encode(command).unwrap();
        let decoded = LegacyCommandCodec.decode(&wire).unwrap();
        assert_eq!(&decoded, command);
    }

    #[test]
    fn test_navigation_round_trip() {
        round_trip(
            &Command::for_session(CommandKind::Get, "s1")
                .with_param("url", json!("https://example.com")),
        );
        round_trip(&Command::for_session(CommandKind::GetCurrentUrl, "s1"));
        round_trip(&Command::for_session(CommandKind::Refresh, "s1"));
    }

    #[test]
    fn test_element_round_trip() {
        round_trip(
            &Command::for_session(CommandKind::ClickElement, "s1").with_param("id", json!("e9")),
        );
        round_trip(
            &Command::for_session(CommandKind::GetElementAttribute, "s1")
                .with_param("id", json!("e9"))
                .with_param("name", json!("class")),
        );
    }

    #[test]
    fn test_send_keys_round_trip() {
        let command = Command::for_session(CommandKind::SendKeysToElement, "s1")
            .with_param("id", json!("e2"))
            .with_param("text", json!("héllo"));
        let wire = LegacyCommandCodec.encode(&command).unwrap();
        assert_eq!(wire.body, json!({"value": ["héllo"]}));
        assert_eq!(LegacyCommandCodec.decode(&wire).unwrap(), command);
    }

    #[test]
    fn test_storage_key_in_url() {
        let command = Command::for_session(CommandKind::GetLocalStorageItem, "s1")
            .with_param("key", json!("token"));
        let wire = LegacyCommandCodec.encode(&command).unwrap();
        assert_eq!(wire.uri, "/session/s1/local_storage/key/token");
        assert_eq!(wire.method, Verb::Get);
        round_trip(&command);
    }

    #[test]
    fn test_unknown_url_is_unknown_command() {
        let wire = WireRequest::new(Verb::Post, "/session/s1/teleport", Value::Null);
        match LegacyCommandCodec.decode(&wire) {
            Err(BridgeError::UnknownCommand(_)) => {},
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }

    #[test]
    fn test_success_response_round_trip() {
        let response = Response::success(Some("s1".into()), json!({"browserName": "firefox"}));
        let wire = LegacyResponseCodec.encode(&response).unwrap();
        assert_eq!(wire.status, 200);
        assert_eq!(wire.body["status"], json!(0));
        assert_eq!(LegacyResponseCodec.decode(&wire).unwrap(), response);
    }

    #[test]
    fn test_error_response_decode() {
        let wire = WireResponse::new(
            500,
            json!({"status": 7, "value": {"message": "no element"}}),
        );
        let response = LegacyResponseCodec.decode(&wire).unwrap();
        assert_eq!(response.status, ErrorCode::NoSuchElement);
        assert_eq!(response.message(), Some("no element"));
    }

    #[test]
    fn test_bare_body_decode() {
        let wire = WireResponse::new(200, json!({"ready": true}));
        let response = LegacyResponseCodec.decode(&wire).unwrap();
        assert!(response.is_success());
        assert_eq!(response.value, json!({"ready": true}));
    }

    #[test]
    fn test_alert_text_extraction() {
        let wire = WireResponse::new(
            500,
            json!({
                "status": 26,
                "value": {"message": "blocked by prompt", "alert": {"text": "Proceed?"}}
            }),
        );
        let response = LegacyResponseCodec.decode(&wire).unwrap();
        assert_eq!(response.status, ErrorCode::UnexpectedAlertOpen);
        assert_eq!(response.alert_text(), Some("Proceed?"));
    }
}
