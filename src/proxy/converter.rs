//! Per-request dialect translation and passthrough.

use bytes::Bytes;
use http::{HeaderMap, HeaderName};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, trace};

use crate::dialect::{Dialect, Verb, WireRequest, WireResponse};
use crate::error::Result;

/// Headers never forwarded across the proxy, in either direction.
pub const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authorization",
    "proxy-authenticate",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// True for headers on the hop-by-hop exclusion list.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    let name = name.as_str();
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}

/// Copy a header map minus hop-by-hop entries.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Rewrite every element reference in a payload from one dialect's key to
/// the other's. Recurses through objects and arrays; everything else passes
/// untouched.
pub fn rewrite_element_keys(value: &Value, from_key: &str, to_key: &str) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, inner) in map {
                let key = if key == from_key {
                    to_key.to_string()
                } else {
                    key.clone()
                };
                out.insert(key, rewrite_element_keys(inner, from_key, to_key));
            }
            Value::Object(out)
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| rewrite_element_keys(item, from_key, to_key))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Forwards one session's commands between a downstream client and an
/// upstream endpoint, translating dialects when they differ.
///
/// Owns no session state; the dialect pair is fixed at session creation and
/// every call is an independent transformation.
pub struct ProtocolConverter {
    upstream: Dialect,
    downstream: Dialect,
    base_url: String,
    client: Client,
}

impl ProtocolConverter {
    pub fn new(client: Client, base_url: &str, upstream: Dialect, downstream: Dialect) -> Self {
        Self {
            upstream,
            downstream,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn upstream_dialect(&self) -> Dialect {
        self.upstream
    }

    pub fn downstream_dialect(&self) -> Dialect {
        self.downstream
    }

    /// True when forwarding needs no translation.
    pub fn is_passthrough(&self) -> bool {
        self.upstream == self.downstream
    }

    /// Forward one wire request and return the wire response, in the
    /// downstream dialect.
    pub async fn forward(&self, request: WireRequest) -> Result<WireResponse> {
        if self.is_passthrough() {
            self.send(request).await
        } else {
            self.bridge(request).await
        }
    }

    /// Dialect-bridging path: decode with the downstream codec, re-encode
    /// upstream, and translate the response back. Element references are
    /// rewritten between the two key names in both directions.
    async fn bridge(&self, request: WireRequest) -> Result<WireResponse> {
        let down_key = self.downstream.element_key();
        let up_key = self.upstream.element_key();

        let mut command = self.downstream.command_codec().decode(&request)?;
        for value in command.parameters.values_mut() {
            *value = rewrite_element_keys(value, down_key, up_key);
        }
        debug!(
            command = command.kind.name(),
            from = %self.downstream,
            to = %self.upstream,
            "bridging command"
        );

        let upstream_request = self.upstream.command_codec().encode(&command)?;
        let upstream_response = self.send(upstream_request).await?;

        let mut response = self.upstream.response_codec().decode(&upstream_response)?;
        response.value = rewrite_element_keys(&response.value, up_key, down_key);
        self.downstream.response_codec().encode(&response)
    }

    /// Send a wire request to the upstream endpoint as-is.
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let url = format!("{}{}", self.base_url, request.uri);
        trace!(method = ?request.method, %url, "upstream request");

        let builder = match request.method {
            Verb::Get => self.client.get(&url),
            Verb::Delete => self.client.delete(&url),
            Verb::Post => self.client.post(&url).json(&request.body),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(WireResponse::new(status, body))
    }

    /// Raw byte-level forwarding for the passthrough path, preserving
    /// headers minus the hop-by-hop set.
    pub async fn send_raw(
        &self,
        method: http::Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<(u16, HeaderMap, Bytes)> {
        let url = format!("{}{}", self.base_url, path_and_query);
        trace!(%method, %url, "upstream raw request");

        let response = self
            .client
            .request(method, &url)
            .headers(strip_hop_by_hop(headers))
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = strip_hop_by_hop(response.headers());
        let bytes = response.bytes().await?;
        Ok((status, headers, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONNECTION, CONTENT_TYPE, TRANSFER_ENCODING, UPGRADE};
    use serde_json::json;

    #[test]
    fn test_hop_by_hop_filtering() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        headers.insert(CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert(UPGRADE, "websocket".parse().unwrap());
        headers.insert("proxy-connection", "keep-alive".parse().unwrap());

        let filtered = strip_hop_by_hop(&headers);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key(CONTENT_TYPE));
    }

    #[test]
    fn test_element_key_rewrite_is_deep() {
        let payload = json!({
            "value": [
                {"ELEMENT": "abc"},
                {"nested": {"ELEMENT": "def", "other": 1}}
            ]
        });
        let rewritten = rewrite_element_keys(
            &payload,
            "ELEMENT",
            "element-6066-11e4-a52e-4f735466cecf",
        );
        assert_eq!(
            rewritten,
            json!({
                "value": [
                    {"element-6066-11e4-a52e-4f735466cecf": "abc"},
                    {"nested": {"element-6066-11e4-a52e-4f735466cecf": "def", "other": 1}}
                ]
            })
        );
    }

    #[test]
    fn test_element_key_rewrite_leaves_values_alone() {
        // Only keys are rewritten; a string value that happens to equal the
        // key name is payload data.
        let payload = json!({"text": "ELEMENT"});
        let rewritten = rewrite_element_keys(&payload, "ELEMENT", "other");
        assert_eq!(rewritten, json!({"text": "ELEMENT"}));
    }
}
