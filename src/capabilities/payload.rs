//! New-session request document parsing and candidate derivation.
//!
//! A session request may carry a legacy `desiredCapabilities` mapping, a W3C
//! `capabilities.alwaysMatch`/`firstMatch` structure, or both. Parsing
//! validates everything up front and produces the ordered candidate list the
//! factory pipeline walks: the legacy candidate first, then each firstMatch
//! entry merged with alwaysMatch.

use serde_json::{Map, Value};

use crate::dialect::{Dialect, DialectSet};
use crate::error::{BridgeError, Result};

use super::caps::{is_accepted_w3c_key, Capabilities};

/// A parsed and validated new-session request document.
#[derive(Debug, Clone)]
pub struct NewSessionPayload {
    candidates: Vec<Capabilities>,
    dialects: DialectSet,
}

impl NewSessionPayload {
    /// Parse a request document. All validation happens here; a returned
    /// payload only ever yields legal candidates.
    pub fn parse(document: &Value) -> Result<Self> {
        let body = document.as_object().ok_or_else(|| {
            BridgeError::InvalidCapabilities("request body must be a JSON object".to_string())
        })?;

        let legacy = match body.get("desiredCapabilities") {
            None => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => {
                return Err(BridgeError::InvalidCapabilities(
                    "desiredCapabilities must be an object".to_string(),
                ))
            },
        };

        let mut always_match: Option<Map<String, Value>> = None;
        let mut first_match: Vec<Map<String, Value>> = Vec::new();
        let mut saw_w3c = false;

        match body.get("capabilities") {
            None => {},
            Some(Value::Object(w3c)) => {
                saw_w3c = true;
                match w3c.get("alwaysMatch") {
                    None => {},
                    Some(Value::Object(map)) => always_match = Some(map.clone()),
                    Some(_) => {
                        return Err(BridgeError::InvalidCapabilities(
                            "alwaysMatch must be an object".to_string(),
                        ))
                    },
                }
                match w3c.get("firstMatch") {
                    None => {},
                    Some(Value::Array(entries)) => {
                        for entry in entries {
                            match entry {
                                Value::Object(map) => first_match.push(map.clone()),
                                _ => {
                                    return Err(BridgeError::InvalidCapabilities(
                                        "firstMatch entries must be objects".to_string(),
                                    ))
                                },
                            }
                        }
                    },
                    Some(_) => {
                        return Err(BridgeError::InvalidCapabilities(
                            "firstMatch must be an array".to_string(),
                        ))
                    },
                }
            },
            Some(_) => {
                return Err(BridgeError::InvalidCapabilities(
                    "capabilities must be an object".to_string(),
                ))
            },
        }

        let mut dialects = DialectSet::new();
        if legacy.is_some() {
            dialects.insert(Dialect::Legacy);
        }
        if saw_w3c {
            dialects.insert(Dialect::W3C);
        }

        let mut candidates: Vec<Capabilities> = Vec::new();

        if let Some(legacy) = &legacy {
            candidates.push(Capabilities::new(legacy.clone()));
        }

        if saw_w3c {
            let always = always_match.unwrap_or_default();
            if first_match.is_empty() {
                candidates.push(Capabilities::from_w3c(always)?);
            } else {
                for first in &first_match {
                    candidates.push(Capabilities::merge(&always, first)?);
                }
            }
        } else if let Some(legacy) = &legacy {
            // Legacy clients never produced W3C-shaped requests, but the
            // upstream may only understand W3C. Synthesize candidates from
            // the flat mapping.
            candidates.extend(project_legacy(legacy));
        }

        dedupe(&mut candidates);

        Ok(Self {
            candidates,
            dialects,
        })
    }

    /// Candidate capability sets in matching priority order. Restartable:
    /// the pipeline retries the same stream against multiple backends.
    pub fn candidates(&self) -> impl Iterator<Item = &Capabilities> {
        self.candidates.iter()
    }

    /// The dialects actually present in the source document. Empty only for
    /// an empty document, in which case callers default to legacy.
    pub fn downstream_dialects(&self) -> DialectSet {
        self.dialects
    }
}

/// Project a flat legacy mapping into W3C-shaped candidates.
///
/// Each vendor extraction rule that fires contributes one candidate carrying
/// the extracted options blob plus the filtered remainder; when no rule
/// fires, the filtered remainder stands alone.
fn project_legacy(legacy: &Map<String, Value>) -> Vec<Capabilities> {
    let base = filter_w3c(legacy);

    let mut candidates = Vec::new();
    for rule in VENDOR_RULES {
        if let Some((namespaced_key, blob)) = (rule.extract)(legacy) {
            let mut candidate = base.clone();
            candidate.insert(namespaced_key.to_string(), blob);
            candidates.push(Capabilities::new(candidate));
        }
    }

    if candidates.is_empty() {
        candidates.push(Capabilities::new(base));
    }
    candidates
}

/// Rename the platform key and drop everything the accepted-key predicate
/// rejects.
fn filter_w3c(legacy: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in legacy {
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

struct VendorRule {
    /// Pull this vendor's options out of the flat mapping, returning the
    /// namespaced key and blob to install in the candidate.
    extract: fn(&Map<String, Value>) -> Option<(&'static str, Value)>,
}

/// Per-vendor extraction rules, applied in a fixed order.
const VENDOR_RULES: &[VendorRule] = &[
    VendorRule {
        extract: |legacy| {
            legacy
                .get("chromeOptions")
                .cloned()
                .map(|blob| ("goog:chromeOptions", blob))
        },
    },
    VendorRule {
        extract: |legacy| {
            // The Firefox blob may already be namespaced, or assembled from
            // the older binary/profile keys.
            if let Some(blob) = legacy.get("moz:firefoxOptions") {
                return Some(("moz:firefoxOptions", blob.clone()));
            }
            let mut options = Map::new();
            if let Some(binary) = legacy.get("firefox_binary") {
                options.insert("binary".to_string(), binary.clone());
            }
            if let Some(profile) = legacy.get("firefox_profile") {
                options.insert("profile".to_string(), profile.clone());
            }
            if options.is_empty() {
                None
            } else {
                Some(("moz:firefoxOptions", Value::Object(options)))
            }
        },
    },
    VendorRule {
        extract: |legacy| {
            legacy
                .get("edgeOptions")
                .cloned()
                .map(|blob| ("ms:edgeOptions", blob))
        },
    },
    VendorRule {
        extract: |legacy| {
            legacy
                .get("se:ieOptions")
                .or_else(|| legacy.get("ieOptions"))
                .cloned()
                .map(|blob| ("se:ieOptions", blob))
        },
    },
    VendorRule {
        extract: |legacy| {
            legacy
                .get("safari.options")
                .cloned()
                .map(|blob| ("safari:options", blob))
        },
    },
    VendorRule {
        extract: |legacy| {
            legacy
                .get("operaOptions")
                .cloned()
                .map(|blob| ("opera:options", blob))
        },
    },
];

/// Drop structurally equal duplicates, keeping the first occurrence. A
/// legacy-only document whose projection adds nothing yields one candidate,
/// not two.
fn dedupe(candidates: &mut Vec<Capabilities>) {
    let mut seen: Vec<Capabilities> = Vec::with_capacity(candidates.len());
    candidates.retain(|candidate| {
        if seen.contains(candidate) {
            false
        } else {
            seen.push(candidate.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(document: Value) -> NewSessionPayload {
        NewSessionPayload::parse(&document).unwrap()
    }

    fn candidate_maps(payload: &NewSessionPayload) -> Vec<Value> {
        payload
            .candidates()
            .map(|c| Value::Object(c.as_map().clone()))
            .collect()
    }

    #[test]
    fn test_legacy_only_yields_one_candidate() {
        let payload = parse(json!({"desiredCapabilities": {"browserName": "chrome"}}));
        assert_eq!(
            candidate_maps(&payload),
            vec![json!({"browserName": "chrome"})]
        );
        let dialects = payload.downstream_dialects();
        assert!(dialects.contains(Dialect::Legacy));
        assert!(!dialects.contains(Dialect::W3C));
    }

    #[test]
    fn test_w3c_first_match_expansion() {
        let payload = parse(json!({
            "capabilities": {
                "alwaysMatch": {"browserName": "firefox"},
                "firstMatch": [{}, {"platformName": "linux"}]
            }
        }));
        assert_eq!(
            candidate_maps(&payload),
            vec![
                json!({"browserName": "firefox"}),
                json!({"browserName": "firefox", "platformName": "linux"}),
            ]
        );
    }

    #[test]
    fn test_overlap_is_rejected() {
        let result = NewSessionPayload::parse(&json!({
            "capabilities": {
                "alwaysMatch": {"browserName": "x"},
                "firstMatch": [{"browserName": "y"}]
            }
        }));
        assert!(matches!(result, Err(BridgeError::InvalidCapabilities(_))));
    }

    #[test]
    fn test_legacy_candidate_precedes_w3c() {
        let payload = parse(json!({
            "desiredCapabilities": {"browserName": "chrome", "takesScreenshot": true},
            "capabilities": {"alwaysMatch": {"browserName": "chrome"}}
        }));
        let maps = candidate_maps(&payload);
        assert_eq!(maps.len(), 2);
        // The legacy set keeps its extra key; the W3C set cannot.
        assert_eq!(maps[0]["takesScreenshot"], json!(true));
        assert_eq!(maps[1], json!({"browserName": "chrome"}));
    }

    #[test]
    fn test_legacy_projection_extracts_chrome_options() {
        let payload = parse(json!({
            "desiredCapabilities": {
                "browserName": "chrome",
                "platform": "LINUX",
                "chromeOptions": {"args": ["--headless"]}
            }
        }));
        let maps = candidate_maps(&payload);
        assert_eq!(maps.len(), 2);
        // Projected candidate: platform renamed, blob namespaced.
        assert_eq!(maps[1]["platformName"], json!("LINUX"));
        assert_eq!(maps[1]["goog:chromeOptions"], json!({"args": ["--headless"]}));
        assert!(maps[1].get("chromeOptions").is_none());
        assert!(maps[1].get("platform").is_none());
    }

    #[test]
    fn test_empty_document() {
        let payload = parse(json!({}));
        assert!(payload.downstream_dialects().is_empty());
        assert_eq!(payload.candidates().count(), 0);
    }

    #[test]
    fn test_candidates_are_restartable() {
        let payload = parse(json!({
            "capabilities": {"firstMatch": [{"browserName": "chrome"}]}
        }));
        assert_eq!(payload.candidates().count(), payload.candidates().count());
    }
}
