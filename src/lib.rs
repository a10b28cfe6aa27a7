//! # wdbridge - WebDriver Dialect Bridge
//!
//! Negotiation and routing layer for remote browser automation. A client
//! starts a session against a browser endpoint that may speak one of two
//! incompatible WebDriver wire dialects (the legacy JSON wire protocol or
//! the standardized W3C protocol); this crate reconciles capability
//! requests, discovers which dialect the far end actually speaks, routes
//! every command/response pair through the right codec, and translates
//! transparently when the two sides disagree.
//!
//! ## Architecture
//!
//! ```text
//! client                     wdbridge                       upstream driver
//!   |                           |                                 |
//!   |-- POST /session --------->| parse + merge capabilities      |
//!   |                           | pipeline: score backends        |
//!   |                           |-- combined new-session body --->|
//!   |                           |<-- dialect-shaped response -----|
//!   |<-- session (your shape) --| sniff shape => detected dialect |
//!   |                           |                                 |
//!   |== commands (dialect A) ==>| convert =====> (dialect B) ====>|
//!   |<== responses (dialect A) =| convert <===== (dialect B) =====|
//! ```
//!
//! ## Dialects
//!
//! | Dialect | New-session shape                         | Element key    |
//! |---------|-------------------------------------------|----------------|
//! | Legacy  | `{"desiredCapabilities": {...}}`          | `ELEMENT`      |
//! | W3C     | `{"capabilities": {"alwaysMatch": ...}}`  | `element-6066…`|
//!
//! Upstream endpoints never reliably declare their dialect, so detection is
//! by trial parsing of the new-session response: an ordered list of shape
//! interpreters, first match wins (see [`handshake`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wdbridge::capabilities::NewSessionPayload;
//! use wdbridge::pipeline::{NewSessionPipeline, UpstreamBackend};
//! use std::sync::Arc;
//!
//! let payload = NewSessionPayload::parse(&serde_json::json!({
//!     "capabilities": {"alwaysMatch": {"browserName": "firefox"}}
//! }))?;
//!
//! let backend = UpstreamBackend::new("local", "http://127.0.0.1:4444", client);
//! let pipeline = NewSessionPipeline::new().with_backend(Arc::new(backend));
//! let session = pipeline.create_session(&payload).await?;
//! ```
//!
//! ## Modules
//!
//! - [`capabilities`]: request-document parsing, merging, and validation
//! - [`dialect`]: the two wire dialects and their command/response codecs
//! - [`handshake`]: dialect detection over the new-session exchange
//! - [`pipeline`]: backend matching, scoring, and session creation
//! - [`proxy`]: per-request dialect translation and passthrough
//! - [`server`]: HTTP front end and the session registry
//! - [`config`]: configuration management
//! - [`error`]: error types and the wire-level code table

pub mod capabilities;
pub mod config;
pub mod dialect;
pub mod error;
pub mod handshake;
pub mod pipeline;
pub mod proxy;
pub mod server;

// Re-exports for convenience
pub use capabilities::{Capabilities, NewSessionPayload, PayloadStore};
pub use config::Config;
pub use dialect::{Command, CommandKind, Dialect, DialectSet, Response, WireRequest, WireResponse};
pub use error::{BridgeError, ErrorCode, Result};
pub use handshake::Established;
pub use pipeline::{ActiveSession, NewSessionPipeline, SessionBackend, UpstreamBackend};
pub use proxy::ProtocolConverter;
pub use server::{AppState, Server, SessionRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
