//! End-to-end negotiation tests.
//!
//! These tests drive the public surface the way a client would: capability
//! documents through parsing and merging, raw handshake bodies through
//! dialect detection, and commands through the codecs and the element-key
//! bridging path.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use wdbridge::capabilities::{Capabilities, NewSessionPayload};
use wdbridge::dialect::{Command, CommandKind, Dialect, Response, WireResponse, W3C_ELEMENT_KEY};
use wdbridge::error::{BridgeError, ErrorCode};
use wdbridge::handshake;
use wdbridge::proxy::rewrite_element_keys;

fn candidate_values(payload: &NewSessionPayload) -> Vec<Value> {
    payload
        .candidates()
        .map(|c| Value::Object(c.as_map().clone()))
        .collect()
}

/// A legacy-only document yields exactly one candidate and the legacy
/// dialect set.
#[test]
fn test_legacy_only_document() {
    let payload = NewSessionPayload::parse(&json!({
        "desiredCapabilities": {"browserName": "chrome"}
    }))
    .unwrap();

    assert_eq!(
        candidate_values(&payload),
        vec![json!({"browserName": "chrome"})]
    );
    let dialects = payload.downstream_dialects();
    assert!(dialects.contains(Dialect::Legacy));
    assert!(!dialects.contains(Dialect::W3C));
}

/// alwaysMatch is merged into every firstMatch entry, preserving order.
#[test]
fn test_first_match_merging() {
    let payload = NewSessionPayload::parse(&json!({
        "capabilities": {
            "alwaysMatch": {"browserName": "firefox"},
            "firstMatch": [{}, {"platformName": "linux"}]
        }
    }))
    .unwrap();

    assert_eq!(
        candidate_values(&payload),
        vec![
            json!({"browserName": "firefox"}),
            json!({"browserName": "firefox", "platformName": "linux"}),
        ]
    );
}

/// Overlapping keys are rejected even when the values agree.
#[test]
fn test_overlap_rejected_regardless_of_value() {
    for first_match_value in ["y", "x"] {
        let result = NewSessionPayload::parse(&json!({
            "capabilities": {
                "alwaysMatch": {"browserName": "x"},
                "firstMatch": [{"browserName": first_match_value}]
            }
        }));
        assert!(
            matches!(result, Err(BridgeError::InvalidCapabilities(_))),
            "firstMatch browserName={first_match_value} should be rejected"
        );
    }
}

/// A document with both sections yields the legacy candidate strictly
/// before any W3C candidate.
#[test]
fn test_legacy_candidate_ordering() {
    let payload = NewSessionPayload::parse(&json!({
        "desiredCapabilities": {"browserName": "chrome", "takesScreenshot": true},
        "capabilities": {"alwaysMatch": {"browserName": "chrome"}}
    }))
    .unwrap();

    let candidates = candidate_values(&payload);
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0]["takesScreenshot"], json!(true));
    assert!(candidates[1].get("takesScreenshot").is_none());
}

/// Dialect detection is a pure function of the raw response.
#[test]
fn test_handshake_detection_scenarios() {
    let w3c = json!({
        "value": {"sessionId": "42", "capabilities": {"browserName": "chrome"}}
    });
    let first = handshake::detect(200, &w3c).unwrap();
    let second = handshake::detect(200, &w3c).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.dialect, Dialect::W3C);
    assert_eq!(first.session_id, "42");

    let legacy = json!({
        "status": 0, "sessionId": "7", "value": {"browserName": "firefox"}
    });
    let established = handshake::detect(200, &legacy).unwrap();
    assert_eq!(established.dialect, Dialect::Legacy);
    assert_eq!(established.session_id, "7");
}

/// The displayedness command has no W3C endpoint and compiles to script
/// execution carrying the element reference under the W3C key.
#[test]
fn test_displayedness_atom_compilation() {
    let command = Command::for_session(CommandKind::IsElementDisplayed, "s1")
        .with_param("id", json!("e7"));
    let wire = Dialect::W3C.command_codec().encode(&command).unwrap();

    assert_eq!(wire.uri, "/session/s1/execute/sync");
    assert!(wire.body["script"].as_str().unwrap().contains("return"));
    assert_eq!(wire.body["args"], json!([{W3C_ELEMENT_KEY: "e7"}]));
}

/// Element references are rewritten between the dialects' key names when
/// bridging; the client-facing form keeps its own key.
#[test]
fn test_element_key_bridging() {
    // What a legacy client sent: a legacy-keyed element reference.
    let downstream_payload = json!({"ELEMENT": "abc"});

    // Upstream wire form uses the W3C key.
    let upstream_form = rewrite_element_keys(&downstream_payload, "ELEMENT", W3C_ELEMENT_KEY);
    assert_eq!(upstream_form, json!({W3C_ELEMENT_KEY: "abc"}));

    // Translating the upstream response back yields the legacy key again.
    let downstream_form = rewrite_element_keys(&upstream_form, W3C_ELEMENT_KEY, "ELEMENT");
    assert_eq!(downstream_form, downstream_payload);
}

/// A full response-translation pass: upstream W3C error decoded, re-encoded
/// for a legacy client, status code table applied.
#[test]
fn test_error_envelope_translation() {
    let upstream = WireResponse::new(
        404,
        json!({"value": {"error": "no such element", "message": "gone"}}),
    );
    let response = Dialect::W3C.response_codec().decode(&upstream).unwrap();
    assert_eq!(response.status, ErrorCode::NoSuchElement);

    let downstream = Dialect::Legacy.response_codec().encode(&response).unwrap();
    assert_eq!(downstream.body["status"], json!(7));
    assert_eq!(downstream.body["value"]["message"], json!("gone"));
}

/// Success envelopes survive the same pass.
#[test]
fn test_success_envelope_translation() {
    let upstream = WireResponse::new(200, json!({"value": "https://example.com"}));
    let response = Dialect::W3C.response_codec().decode(&upstream).unwrap();
    assert!(response.is_success());

    let downstream = Dialect::Legacy.response_codec().encode(&response).unwrap();
    assert_eq!(downstream.body["status"], json!(0));
    assert_eq!(downstream.body["value"], json!("https://example.com"));
}

/// Commands legal in both dialects survive decode(encode(..)) in each.
#[test]
fn test_codec_round_trip_both_dialects() {
    let commands = [
        Command::for_session(CommandKind::Get, "s1").with_param("url", json!("https://x.test")),
        Command::for_session(CommandKind::GetTitle, "s1"),
        Command::for_session(CommandKind::FindElement, "s1")
            .with_param("using", json!("css selector"))
            .with_param("value", json!("#app")),
        Command::for_session(CommandKind::DeleteSession, "s1"),
    ];

    for dialect in [Dialect::Legacy, Dialect::W3C] {
        for command in &commands {
            let wire = dialect.command_codec().encode(command).unwrap();
            let decoded = dialect.command_codec().decode(&wire).unwrap();
            assert_eq!(&decoded, command, "{dialect} round trip");
        }
    }
}

/// Legacy responses round-trip through the legacy codec.
#[test]
fn test_legacy_response_round_trip() {
    let response = Response::success(Some("s9".into()), json!({"ready": true}));
    let wire = Dialect::Legacy.response_codec().encode(&response).unwrap();
    let decoded = Dialect::Legacy.response_codec().decode(&wire).unwrap();
    assert_eq!(decoded, response);
}

fn arb_key() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z0-9]{0,12}".prop_map(Value::String),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
    ]
}

proptest! {
    /// For disjoint key sets the merge is exactly the union; any overlap is
    /// an error regardless of values.
    #[test]
    fn prop_merge_is_union_for_disjoint_keys(
        entries in proptest::collection::hash_map(arb_key(), (arb_value(), any::<bool>()), 0..8)
    ) {
        let mut always = Map::new();
        let mut first = Map::new();
        // Partition the generated keys between the two sides; disjoint by
        // construction.
        for (key, (value, side)) in &entries {
            let target = if *side { &mut always } else { &mut first };
            // Vendor-namespace the keys so the merged set passes W3C
            // validation whatever the key text is.
            target.insert(format!("t:{key}"), value.clone());
        }

        let merged = Capabilities::merge(&always, &first).unwrap();
        prop_assert_eq!(merged.len(), always.len() + first.len());
        for (key, value) in always.iter().chain(first.iter()) {
            prop_assert_eq!(merged.get(key), Some(value));
        }
    }

    /// Any shared key makes the merge fail, even with equal values.
    #[test]
    fn prop_merge_rejects_any_overlap(
        key in arb_key(),
        value in arb_value(),
        equal in any::<bool>(),
    ) {
        let namespaced = format!("t:{key}");
        let mut always = Map::new();
        always.insert(namespaced.clone(), value.clone());
        let mut first = Map::new();
        let first_value = if equal { value } else { json!("different") };
        first.insert(namespaced, first_value);

        prop_assert!(matches!(
            Capabilities::merge(&always, &first),
            Err(BridgeError::InvalidCapabilities(_))
        ));
    }
}
