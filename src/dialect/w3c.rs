//! W3C dialect codecs.
//!
//! The W3C dialect is the more involved of the two: many legacy commands
//! have no native endpoint and are compiled to a generic execute-script call
//! (see [`super::atoms`]) or to a single-action input sequence. Element
//! lookup strategies that the standard dropped are remapped onto CSS
//! selectors, and key text travels as one Unicode code point per keystroke.

use serde_json::{json, Map, Value};

use crate::error::{BridgeError, ErrorCode, Result};

use super::atoms;
use super::command::{Command, CommandKind};
use super::response::{Response, WireRequest, WireResponse};
use super::routes::{expand_template, match_template, w3c_route, Verb, W3cRoute};
use super::{CommandCodec, ResponseCodec, W3C_ELEMENT_KEY};

/// Synthetic input device ids for single-shot action sequences.
const POINTER_DEVICE_ID: &str = "default mouse";
const KEYBOARD_DEVICE_ID: &str = "default keyboard";

/// Command codec for the W3C dialect.
pub struct W3cCommandCodec;

impl CommandCodec for W3cCommandCodec {
    fn encode(&self, command: &Command) -> Result<WireRequest> {
        match w3c_route(command.kind) {
            W3cRoute::Direct(route) => encode_direct(command, route.method, route.template),
            W3cRoute::Script => encode_script(command),
            W3cRoute::Actions => encode_actions(command),
        }
    }

    fn decode(&self, request: &WireRequest) -> Result<Command> {
        for kind in CommandKind::ALL {
            // Script/Actions kinds have no wire form of their own; their
            // encodings decode as executeScript / a plain actions call.
            let W3cRoute::Direct(route) = w3c_route(*kind) else {
                continue;
            };
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
                CommandKind::SendKeysToElement => {
                    parameters.insert("text".to_string(), Value::String(decode_keys(&request.body)));
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

fn encode_direct(command: &Command, method: Verb, template: &'static str) -> Result<WireRequest> {
    let mut consumed: Vec<&str> = Vec::new();
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

    let body = match method {
        Verb::Get | Verb::Delete => Value::Null,
        Verb::Post => match command.kind {
            CommandKind::FindElement
            | CommandKind::FindElements
            | CommandKind::FindChildElement
            | CommandKind::FindChildElements => {
                let using = command.param_str("using").unwrap_or_default();
                let value = command.param_str("value").unwrap_or_default();
                let (using, value) = remap_locator(using, value);
                json!({ "using": using, "value": value })
            },
            CommandKind::SendKeysToElement => {
                let text = command.param_str("text").unwrap_or_default();
                json!({ "text": text, "value": codepoints(text) })
            },
            _ => {
                let remaining: Map<String, Value> = command
                    .parameters
                    .iter()
                    .filter(|(k, _)| !consumed.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Value::Object(remaining)
            },
        },
    };

    Ok(WireRequest::new(method, uri, body))
}

/// Compile a legacy-only command down to an execute-script call.
fn encode_script(command: &Command) -> Result<WireRequest> {
    let element = || {
        command
            .param_str("id")
            .map(|id| json!({ W3C_ELEMENT_KEY: id }))
            .ok_or_else(|| {
                BridgeError::Protocol(format!("{} requires an element id", command.kind.name()))
            })
    };
    let key = || command.param("key").cloned().unwrap_or(Value::Null);

    let (script, args): (&str, Vec<Value>) = match command.kind {
        CommandKind::IsElementDisplayed => (atoms::IS_DISPLAYED, vec![element()?]),
        CommandKind::GetElementLocationOnceScrolledIntoView => {
            (atoms::LOCATION_IN_VIEW, vec![element()?])
        },
        CommandKind::SubmitElement => (atoms::SUBMIT, vec![element()?]),
        CommandKind::GetPageSource => (atoms::PAGE_SOURCE, vec![]),
        CommandKind::GetLocalStorageItem => (atoms::GET_LOCAL_STORAGE_ITEM, vec![key()]),
        CommandKind::RemoveLocalStorageItem => (atoms::REMOVE_LOCAL_STORAGE_ITEM, vec![key()]),
        CommandKind::SetLocalStorageItem => (
            atoms::SET_LOCAL_STORAGE_ITEM,
            vec![key(), command.param("value").cloned().unwrap_or(Value::Null)],
        ),
        CommandKind::GetSessionStorageItem => (atoms::GET_SESSION_STORAGE_ITEM, vec![key()]),
        CommandKind::RemoveSessionStorageItem => {
            (atoms::REMOVE_SESSION_STORAGE_ITEM, vec![key()])
        },
        CommandKind::SetSessionStorageItem => (
            atoms::SET_SESSION_STORAGE_ITEM,
            vec![key(), command.param("value").cloned().unwrap_or(Value::Null)],
        ),
        other => {
            return Err(BridgeError::Protocol(format!(
                "{} has no script fallback",
                other.name()
            )))
        },
    };

    let uri = session_uri(command, "execute/sync")?;
    Ok(WireRequest::new(
        Verb::Post,
        uri,
        json!({ "script": script, "args": args }),
    ))
}

/// Compile a legacy single-shot input command to a one-device action
/// sequence.
fn encode_actions(command: &Command) -> Result<WireRequest> {
    let button = command
        .param("button")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let down = json!({ "type": "pointerDown", "button": button });
    let up = json!({ "type": "pointerUp", "button": button });

    let device = match command.kind {
        CommandKind::Click => pointer_device(vec![down, up]),
        CommandKind::DoubleClick => {
            pointer_device(vec![down.clone(), up.clone(), down, up])
        },
        CommandKind::MouseDown => pointer_device(vec![down]),
        CommandKind::MouseUp => pointer_device(vec![up]),
        CommandKind::MouseMove => {
            let origin = match command.param_str("element") {
                Some(id) => json!({ W3C_ELEMENT_KEY: id }),
                None => json!("pointer"),
            };
            let x = command.param("xoffset").and_then(Value::as_i64).unwrap_or(0);
            let y = command.param("yoffset").and_then(Value::as_i64).unwrap_or(0);
            pointer_device(vec![json!({
                "type": "pointerMove",
                "duration": 100,
                "origin": origin,
                "x": x,
                "y": y,
            })])
        },
        CommandKind::SendKeysToActiveElement => {
            let text = command.param_str("text").unwrap_or_default();
            let mut actions = Vec::with_capacity(text.chars().count() * 2);
            for ch in text.chars() {
                let key = ch.to_string();
                actions.push(json!({ "type": "keyDown", "value": key }));
                actions.push(json!({ "type": "keyUp", "value": key }));
            }
            json!({
                "type": "key",
                "id": KEYBOARD_DEVICE_ID,
                "actions": actions,
            })
        },
        other => {
            return Err(BridgeError::Protocol(format!(
                "{} has no action synthesis",
                other.name()
            )))
        },
    };

    let uri = session_uri(command, "actions")?;
    Ok(WireRequest::new(
        Verb::Post,
        uri,
        json!({ "actions": [device] }),
    ))
}

fn pointer_device(actions: Vec<Value>) -> Value {
    json!({
        "type": "pointer",
        "id": POINTER_DEVICE_ID,
        "parameters": { "pointerType": "mouse" },
        "actions": actions,
    })
}

fn session_uri(command: &Command, suffix: &str) -> Result<String> {
    let session_id = command.session_id.as_deref().ok_or_else(|| {
        BridgeError::Protocol(format!("{} requires a session", command.kind.name()))
    })?;
    Ok(format!("/session/{session_id}/{suffix}"))
}

/// Reassemble typed text from a W3C send-keys body.
fn decode_keys(body: &Value) -> String {
    if let Some(text) = body.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    body.get("value")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(Value::as_str).collect::<String>())
        .unwrap_or_default()
}

/// Split text into the per-code-point strings the wire format expects.
///
/// `char` is a Unicode scalar value, so supplementary-plane characters stay
/// whole instead of being split into UTF-16 surrogate halves.
pub fn codepoints(text: &str) -> Vec<String> {
    text.chars().map(|c| c.to_string()).collect()
}

/// Remap a legacy element lookup strategy onto the W3C set.
///
/// `xpath`, `link text`, and `partial link text` pass through unchanged;
/// the rest compile to CSS selectors.
pub fn remap_locator(using: &str, value: &str) -> (String, String) {
    match using {
        "class name" => ("css selector".into(), format!(".{}", css_escape(value))),
        "id" => ("css selector".into(), format!("#{}", css_escape(value))),
        "name" => (
            "css selector".into(),
            format!("*[name='{}']", value.replace('\'', "\\'")),
        ),
        "tag name" => ("css selector".into(), css_escape(value)),
        _ => (using.into(), value.into()),
    }
}

/// Escape a string for use as a CSS identifier, per the CSS escaping rule.
///
/// Control characters and a leading digit (or hyphen-digit) become numeric
/// escapes; other non-identifier characters get a backslash.
pub fn css_escape(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let chars: Vec<char> = ident.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        let escaped = match c {
            '\0' => {
                out.push('\u{FFFD}');
                continue;
            },
            '\u{1}'..='\u{1f}' | '\u{7f}' => true,
            '0'..='9' if i == 0 || (i == 1 && chars[0] == '-') => true,
            _ => false,
        };
        if escaped {
            out.push_str(&format!("\\{:x} ", c as u32));
            continue;
        }
        let identifier_char = c == '-'
            || c == '_'
            || c.is_ascii_alphanumeric()
            || c as u32 >= 0x80;
        if identifier_char {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

/// Response codec for the W3C dialect.
pub struct W3cResponseCodec;

impl ResponseCodec for W3cResponseCodec {
    fn encode(&self, response: &Response) -> Result<WireResponse> {
        if response.is_success() {
            return Ok(WireResponse::new(
                200,
                json!({ "value": response.value }),
            ));
        }

        let mut error = Map::new();
        error.insert(
            "error".to_string(),
            Value::String(response.status.w3c_name().to_string()),
        );
        error.insert(
            "message".to_string(),
            Value::String(response.message().unwrap_or("").to_string()),
        );
        error.insert(
            "stacktrace".to_string(),
            response
                .value
                .get("stacktrace")
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
        );
        if let Some(text) = response.alert_text() {
            error.insert("data".to_string(), json!({ "text": text }));
        }

        Ok(WireResponse::new(
            response.status.http_status(),
            json!({ "value": Value::Object(error) }),
        ))
    }

    fn decode(&self, wire: &WireResponse) -> Result<Response> {
        let value = wire.body.get("value");

        // Error shape: value carries an error name.
        if let Some(error_name) = value
            .and_then(|v| v.get("error"))
            .and_then(Value::as_str)
        {
            let code = ErrorCode::from_w3c_name(error_name);
            let message = value
                .and_then(|v| v.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            if code == ErrorCode::UnexpectedAlertOpen {
                // Alert text is not in the message; it rides in the nested
                // data field.
                let text = value
                    .and_then(|v| v.get("data"))
                    .and_then(|d| d.get("text"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                return Ok(Response::alert_error(message, text));
            }
            return Ok(Response::error(code, message));
        }

        // Success shape: value envelope.
        if let Some(value) = value {
            if wire.is_http_success() {
                let session_id = value
                    .get("sessionId")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                return Ok(Response::success(session_id, value.clone()));
            }
        }

        if wire.is_http_success() {
            // Tolerate a bare body from not-quite-conformant endpoints.
            return Ok(Response::success(None, wire.body.clone()));
        }

        Ok(Response::error(
            ErrorCode::UnknownError,
            format!("upstream returned HTTP {} without an error object", wire.status),
        ))
    }
}
