//! Dialect and codec registry.
//!
//! WebDriver endpoints speak one of two incompatible wire dialects: the
//! legacy JSON wire protocol or the standardized W3C protocol. Each
//! [`Dialect`] value owns exactly one command codec, one response codec, and
//! one element reference key; all three are fixed at process start.
//!
//! | Dialect | Element key                              | Script surface         |
//! |---------|------------------------------------------|------------------------|
//! | Legacy  | `ELEMENT`                                | `/execute`             |
//! | W3C     | `element-6066-11e4-a52e-4f735466cecf`    | `/execute/sync`        |
//!
//! Codecs are pure: `decode(encode(command)) == command` for any command
//! whose parameters only use keys and shapes legal in that dialect.

pub mod atoms;
pub mod command;
pub mod legacy;
pub mod response;
pub mod routes;
pub mod w3c;

pub use command::{Command, CommandKind};
pub use response::{Response, WireRequest, WireResponse};
pub use routes::{Route, Verb, W3cRoute};

use crate::error::Result;

/// Element reference key in the legacy dialect.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Element reference key in the W3C dialect (fixed by the standard).
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Serializes commands to dialect-specific wire requests and back.
pub trait CommandCodec: Send + Sync {
    /// Encode a command into a wire request.
    fn encode(&self, command: &Command) -> Result<WireRequest>;
    /// Decode a wire request into a command.
    fn decode(&self, request: &WireRequest) -> Result<Command>;
}

/// Serializes responses to dialect-specific wire responses and back.
pub trait ResponseCodec: Send + Sync {
    /// Encode a response into a wire response.
    fn encode(&self, response: &Response) -> Result<WireResponse>;
    /// Decode a wire response into a response.
    fn decode(&self, response: &WireResponse) -> Result<Response>;
}

/// One of the two WebDriver wire dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Legacy JSON wire protocol.
    Legacy,
    /// W3C standardized protocol.
    W3C,
}

impl Dialect {
    /// Field name used to marshal element handles in this dialect.
    pub fn element_key(self) -> &'static str {
        match self {
            Dialect::Legacy => LEGACY_ELEMENT_KEY,
            Dialect::W3C => W3C_ELEMENT_KEY,
        }
    }

    /// This dialect's command codec singleton.
    pub fn command_codec(self) -> &'static dyn CommandCodec {
        match self {
            Dialect::Legacy => &legacy::LegacyCommandCodec,
            Dialect::W3C => &w3c::W3cCommandCodec,
        }
    }

    /// This dialect's response codec singleton.
    pub fn response_codec(self) -> &'static dyn ResponseCodec {
        match self {
            Dialect::Legacy => &legacy::LegacyResponseCodec,
            Dialect::W3C => &w3c::W3cResponseCodec,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Legacy => write!(f, "OSS"),
            Dialect::W3C => write!(f, "W3C"),
        }
    }
}

/// The set of dialects a downstream client has shown it can accept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialectSet {
    legacy: bool,
    w3c: bool,
}

impl DialectSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one dialect.
    pub fn insert(&mut self, dialect: Dialect) {
        match dialect {
            Dialect::Legacy => self.legacy = true,
            Dialect::W3C => self.w3c = true,
        }
    }

    /// Membership test.
    pub fn contains(self, dialect: Dialect) -> bool {
        match dialect {
            Dialect::Legacy => self.legacy,
            Dialect::W3C => self.w3c,
        }
    }

    /// True when no dialect was observed in the source document.
    pub fn is_empty(self) -> bool {
        !self.legacy && !self.w3c
    }

    /// Pick the dialect a session should speak downstream: `preferred` when
    /// the client accepts it, otherwise the first dialect the client does
    /// accept. An empty set (empty request document) defaults to legacy.
    pub fn resolve(self, preferred: Dialect) -> Dialect {
        if self.contains(preferred) {
            preferred
        } else if self.w3c {
            Dialect::W3C
        } else {
            Dialect::Legacy
        }
    }
}

impl FromIterator<Dialect> for DialectSet {
    fn from_iter<T: IntoIterator<Item = Dialect>>(iter: T) -> Self {
        let mut set = Self::new();
        for dialect in iter {
            set.insert(dialect);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_keys_differ() {
        assert_eq!(Dialect::Legacy.element_key(), "ELEMENT");
        assert_eq!(
            Dialect::W3C.element_key(),
            "element-6066-11e4-a52e-4f735466cecf"
        );
    }

    #[test]
    fn test_dialect_set_resolve() {
        let both: DialectSet = [Dialect::Legacy, Dialect::W3C].into_iter().collect();
        assert_eq!(both.resolve(Dialect::W3C), Dialect::W3C);

        let legacy_only: DialectSet = [Dialect::Legacy].into_iter().collect();
        assert_eq!(legacy_only.resolve(Dialect::W3C), Dialect::Legacy);

        // Empty request document: default to legacy.
        assert_eq!(DialectSet::new().resolve(Dialect::W3C), Dialect::Legacy);
    }
}
