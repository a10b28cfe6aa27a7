//! Session factory pipeline.
//!
//! Turns the ordered candidate capability sets from a parsed request into
//! exactly one active session, or fails naming the exhausted attempts.
//! Candidates are tried in payload order; for each candidate the registered
//! backends that match (by capability score or by key-presence heuristic)
//! are tried best-score-first, ties broken by registration order. The first
//! backend that matches AND completes its handshake wins. Validation and
//! handshake failures advance the walk instead of aborting it.

pub mod mutators;
pub mod platform;
pub mod scoring;

pub use mutators::{CapabilityMutator, DefaultEntry, DefaultPlatform, MutatorChain};
pub use platform::Platform;
pub use scoring::Scorer;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::capabilities::{Capabilities, NewSessionPayload};
use crate::dialect::{Dialect, Verb, WireRequest, WireResponse};
use crate::error::{BridgeError, Result};
use crate::handshake;
use crate::proxy::ProtocolConverter;

/// A concrete session-creating implementation.
///
/// A backend matches candidates one of two ways: by declaring the
/// capability set it provides (scored matching), or by recognizing a
/// signature key in the candidate (key-presence heuristic). Both may be
/// active at once.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Name used in logs and exhaustion errors.
    fn name(&self) -> &str;

    /// The capability set this backend provides, for scored matching.
    fn provided_capabilities(&self) -> Option<&Capabilities> {
        None
    }

    /// Key-presence heuristic: true when the candidate carries this
    /// backend's signature (an explicit browser name or a vendor options
    /// key).
    fn recognizes(&self, _caps: &Capabilities) -> bool {
        false
    }

    /// Create a real session for the candidate. The downstream dialect is
    /// the one the requesting client speaks.
    async fn new_session(&self, caps: &Capabilities, downstream: Dialect)
        -> Result<ActiveSession>;
}

/// An established session: identity, the dialect pair, the resolved
/// capabilities, and the converter every later command flows through.
pub struct ActiveSession {
    id: String,
    capabilities: Value,
    converter: ProtocolConverter,
    // The upstream endpoint is not reentrant; commands within one session
    // run strictly one at a time.
    lock: tokio::sync::Mutex<()>,
}

impl ActiveSession {
    pub fn new(id: String, capabilities: Value, converter: ProtocolConverter) -> Self {
        Self {
            id,
            capabilities,
            converter,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capabilities(&self) -> &Value {
        &self.capabilities
    }

    pub fn upstream_dialect(&self) -> Dialect {
        self.converter.upstream_dialect()
    }

    pub fn downstream_dialect(&self) -> Dialect {
        self.converter.downstream_dialect()
    }

    pub fn converter(&self) -> &ProtocolConverter {
        &self.converter
    }

    /// Run one command through the converter, holding the per-session lock
    /// for the duration and bounding the wait.
    ///
    /// On expiry the in-flight future is dropped; the HTTP client drains the
    /// connection, so the next command's response stream starts clean.
    pub async fn execute(&self, request: WireRequest, limit: Duration) -> Result<WireResponse> {
        let _serialized = self.lock.lock().await;
        match tokio::time::timeout(limit, self.converter.forward(request)).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::CommandTimeout(limit)),
        }
    }

    /// Byte-level forwarding for sessions whose dialects match: no decode,
    /// headers preserved minus the hop-by-hop set. Same lock and timeout
    /// discipline as [`ActiveSession::execute`].
    pub async fn execute_raw(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
        limit: Duration,
    ) -> Result<(u16, HeaderMap, Bytes)> {
        let _serialized = self.lock.lock().await;
        let forward = self
            .converter
            .send_raw(method, path_and_query, headers, body);
        match tokio::time::timeout(limit, forward).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::CommandTimeout(limit)),
        }
    }

    /// Best-effort teardown of the backing session. Eviction can race with
    /// a session the client never closed, so failures are logged and
    /// swallowed, never propagated.
    pub async fn stop(&self) {
        let request = WireRequest::new(
            Verb::Delete,
            format!("/session/{}", self.id),
            Value::Null,
        );
        if let Err(error) = self.converter.forward(request).await {
            warn!(session_id = %self.id, %error, "failed to stop backing session");
        }
    }
}

/// A backend that proxies sessions to an upstream WebDriver endpoint,
/// discovering its dialect through the handshake.
pub struct UpstreamBackend {
    name: String,
    base_url: String,
    client: Client,
    provided: Option<Capabilities>,
    signature_keys: Vec<String>,
    browser_names: Vec<String>,
}

impl UpstreamBackend {
    pub fn new(name: &str, base_url: &str, client: Client) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            provided: None,
            signature_keys: Vec::new(),
            browser_names: Vec::new(),
        }
    }

    /// Declare the capability set this backend provides.
    pub fn with_provided(mut self, caps: Capabilities) -> Self {
        self.provided = Some(caps);
        self
    }

    /// Recognize candidates carrying this key (e.g. `moz:firefoxOptions`).
    pub fn with_signature_key(mut self, key: &str) -> Self {
        self.signature_keys.push(key.to_string());
        self
    }

    /// Recognize candidates requesting this browser name.
    pub fn with_browser_name(mut self, name: &str) -> Self {
        self.browser_names.push(name.to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SessionBackend for UpstreamBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn provided_capabilities(&self) -> Option<&Capabilities> {
        self.provided.as_ref()
    }

    fn recognizes(&self, caps: &Capabilities) -> bool {
        if self.signature_keys.iter().any(|key| caps.contains_key(key)) {
            return true;
        }
        match caps.browser_name() {
            Some(name) => self
                .browser_names
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(name)),
            None => false,
        }
    }

    async fn new_session(
        &self,
        caps: &Capabilities,
        downstream: Dialect,
    ) -> Result<ActiveSession> {
        let established = handshake::begin_session(&self.client, &self.base_url, caps).await?;
        let converter = ProtocolConverter::new(
            self.client.clone(),
            &self.base_url,
            established.dialect,
            downstream,
        );
        Ok(ActiveSession::new(
            established.session_id,
            established.capabilities,
            converter,
        ))
    }
}

/// The pipeline: mutators, scorer, and backends in registration order, plus
/// an optional fallback invoked with empty capabilities after exhaustion.
pub struct NewSessionPipeline {
    backends: Vec<Arc<dyn SessionBackend>>,
    fallback: Option<Arc<dyn SessionBackend>>,
    mutators: MutatorChain,
    scorer: Scorer,
}

impl Default for NewSessionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl NewSessionPipeline {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            fallback: None,
            mutators: MutatorChain::new(),
            scorer: Scorer::new(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn SessionBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn with_fallback(mut self, backend: Arc<dyn SessionBackend>) -> Self {
        self.fallback = Some(backend);
        self
    }

    pub fn with_mutator(mut self, mutator: Box<dyn CapabilityMutator>) -> Self {
        self.mutators.push(mutator);
        self
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Drive the whole pipeline for one parsed request.
    pub async fn create_session(&self, payload: &NewSessionPayload) -> Result<ActiveSession> {
        let downstream = payload.downstream_dialects().resolve(Dialect::W3C);
        let mut attempts: Vec<String> = Vec::new();

        for candidate in payload.candidates() {
            let candidate = self.mutators.apply(candidate);

            for (backend, score) in self.matching_backends(&candidate) {
                debug!(
                    backend = backend.name(),
                    score,
                    "attempting session against backend"
                );
                match backend.new_session(&candidate, downstream).await {
                    Ok(session) => return Ok(session),
                    Err(error) => {
                        debug!(backend = backend.name(), %error, "backend attempt failed");
                        attempts.push(format!("{}: {}", backend.name(), error));
                    },
                }
            }
        }

        if let Some(fallback) = &self.fallback {
            debug!(backend = fallback.name(), "invoking fallback backend");
            match fallback.new_session(&Capabilities::empty(), downstream).await {
                Ok(session) => return Ok(session),
                Err(error) => attempts.push(format!("{} (fallback): {}", fallback.name(), error)),
            }
        }

        if attempts.is_empty() {
            attempts.push("no backend matched any candidate".to_string());
        }
        Err(BridgeError::SessionNotCreated(attempts.join("; ")))
    }

    /// Backends matching the candidate, ordered best score first with
    /// registration order as the tie break. A heuristic-only match carries
    /// score zero but still participates.
    fn matching_backends(&self, candidate: &Capabilities) -> Vec<(&dyn SessionBackend, u32)> {
        let mut matched: Vec<(usize, &dyn SessionBackend, u32)> = Vec::new();
        for (index, backend) in self.backends.iter().enumerate() {
            let scored = backend
                .provided_capabilities()
                .and_then(|provided| self.scorer.score(candidate, provided));
            match scored {
                Some(score) => matched.push((index, backend.as_ref(), score)),
                None if backend.recognizes(candidate) => {
                    matched.push((index, backend.as_ref(), 0));
                },
                None => {},
            }
        }
        matched.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
        matched
            .into_iter()
            .map(|(_, backend, score)| (backend, score))
            .collect()
    }
}
