//! The capability set value type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

/// Plain (non-vendor) keys legal in a W3C capability set.
pub const W3C_ACCEPTED_KEYS: [&str; 9] = [
    "acceptInsecureCerts",
    "browserName",
    "browserVersion",
    "platformName",
    "pageLoadStrategy",
    "proxy",
    "setWindowRect",
    "timeouts",
    "unhandledPromptBehavior",
];

/// Vendor-extension keys carry a `namespace:key` shape.
pub fn is_vendor_key(key: &str) -> bool {
    matches!(key.split_once(':'), Some((ns, rest)) if !ns.is_empty() && !rest.is_empty())
}

/// Accepted-key predicate for W3C capability sets.
pub fn is_accepted_w3c_key(key: &str) -> bool {
    W3C_ACCEPTED_KEYS.contains(&key) || is_vendor_key(key)
}

/// An immutable set of requested session properties.
///
/// Constructed once from a parsed request document and never mutated;
/// transforms produce new values. Typed accessors cover the recognized W3C
/// fields, everything else (vendor extensions included) stays reachable
/// through [`Capabilities::get`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(Map<String, Value>);

impl Capabilities {
    /// Wrap a raw mapping without validation. Used for legacy capability
    /// sets, which accept any keys.
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Empty set.
    pub fn empty() -> Self {
        Self(Map::new())
    }

    /// Wrap a mapping after validating it as a W3C capability set: no null
    /// values, and every key either on the allow-list or vendor-namespaced.
    pub fn from_w3c(map: Map<String, Value>) -> Result<Self> {
        for (key, value) in &map {
            if value.is_null() {
                return Err(BridgeError::InvalidCapabilities(format!(
                    "capability {key} must not be null"
                )));
            }
            if !is_accepted_w3c_key(key) {
                return Err(BridgeError::InvalidCapabilities(format!(
                    "{key} is not a recognized capability"
                )));
            }
        }
        Ok(Self(map))
    }

    /// Merge an alwaysMatch mapping with one firstMatch entry.
    ///
    /// Any key overlap is an error, even when the values are equal; merging
    /// must never have to choose between two requested values.
    pub fn merge(always: &Map<String, Value>, first: &Map<String, Value>) -> Result<Self> {
        let mut merged = always.clone();
        for (key, value) in first {
            if merged.contains_key(key) {
                return Err(BridgeError::InvalidCapabilities(format!(
                    "capability {key} appears in both alwaysMatch and firstMatch"
                )));
            }
            merged.insert(key.clone(), value.clone());
        }
        Self::from_w3c(merged)
    }

    /// Raw value lookup by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Key presence test.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True for a set with no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The underlying ordered mapping.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwrap into the underlying mapping.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Requested browser name.
    pub fn browser_name(&self) -> Option<&str> {
        self.str_field("browserName")
    }

    /// Requested browser version, under the W3C or legacy key.
    pub fn browser_version(&self) -> Option<&str> {
        // Legacy sets spell this "version".
        self.str_field("browserVersion")
            .or_else(|| self.str_field("version"))
    }

    /// Requested platform, under the W3C or legacy key.
    pub fn platform_name(&self) -> Option<&str> {
        self.str_field("platformName")
            .or_else(|| self.str_field("platform"))
    }

    /// Whether insecure TLS certificates are acceptable.
    pub fn accept_insecure_certs(&self) -> Option<bool> {
        self.0.get("acceptInsecureCerts").and_then(Value::as_bool)
    }

    /// Requested page load strategy.
    pub fn page_load_strategy(&self) -> Option<&str> {
        self.str_field("pageLoadStrategy")
    }

    /// Requested proxy configuration.
    pub fn proxy(&self) -> Option<&Value> {
        self.0.get("proxy")
    }

    /// Whether window sizing/positioning commands are required.
    pub fn set_window_rect(&self) -> Option<bool> {
        self.0.get("setWindowRect").and_then(Value::as_bool)
    }

    /// Requested session timeouts.
    pub fn timeouts(&self) -> Option<&Value> {
        self.0.get("timeouts")
    }

    /// Requested unhandled-prompt handling.
    pub fn unhandled_prompt_behavior(&self) -> Option<&str> {
        self.str_field("unhandledPromptBehavior")
    }

    /// Legacy javascript-enabled flag; absent in W3C sets.
    pub fn javascript_enabled(&self) -> Option<bool> {
        self.0.get("javascriptEnabled").and_then(Value::as_bool)
    }

    /// Vendor-namespaced entries only.
    pub fn vendor_extensions(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter().filter(|(k, _)| is_vendor_key(k))
    }

    /// A copy with one entry added or replaced.
    pub fn with_entry(&self, key: &str, value: Value) -> Self {
        let mut map = self.0.clone();
        map.insert(key.to_string(), value);
        Self(map)
    }
}

impl From<Map<String, Value>> for Capabilities {
    fn from(map: Map<String, Value>) -> Self {
        Self::new(map)
    }
}
