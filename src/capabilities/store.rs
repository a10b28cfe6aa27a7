//! Bounded-memory request body store.
//!
//! New-session documents can be arbitrarily large (embedded browser
//! profiles, base64 blobs). Bodies above a threshold are spilled to a
//! temporary file instead of being held in memory; the file is removed when
//! the store drops, on every exit path including parse errors.

use std::io::{Read, Seek, SeekFrom, Write};

use bytes::Bytes;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

/// Spill threshold used by the server front end.
pub const DEFAULT_SPILL_THRESHOLD: usize = 1024 * 1024;

enum Backing {
    Memory(Bytes),
    Disk { file: NamedTempFile, len: usize },
}

/// A request body held in memory or on disk.
pub struct PayloadStore {
    backing: Backing,
}

impl PayloadStore {
    /// Store a body, spilling to a temp file when it exceeds `threshold`
    /// bytes.
    pub fn new(body: Bytes, threshold: usize) -> Result<Self> {
        if body.len() <= threshold {
            return Ok(Self {
                backing: Backing::Memory(body),
            });
        }

        let mut file = NamedTempFile::new()?;
        file.write_all(&body)?;
        file.flush()?;
        debug!(bytes = body.len(), path = %file.path().display(), "spilled request body to disk");
        Ok(Self {
            backing: Backing::Disk {
                file,
                len: body.len(),
            },
        })
    }

    /// Body size in bytes.
    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Memory(bytes) => bytes.len(),
            Backing::Disk { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the body lives on disk.
    pub fn is_spilled(&self) -> bool {
        matches!(self.backing, Backing::Disk { .. })
    }

    /// Parse the stored body as JSON. Re-readable; the store keeps its
    /// backing until dropped.
    pub fn json(&mut self) -> Result<Value> {
        match &mut self.backing {
            Backing::Memory(bytes) => Ok(serde_json::from_slice(bytes)?),
            Backing::Disk { file, len } => {
                file.seek(SeekFrom::Start(0))?;
                let mut buf = Vec::with_capacity(*len);
                file.read_to_end(&mut buf)?;
                Ok(serde_json::from_slice(&buf)?)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_small_body_stays_in_memory() {
        let mut store = PayloadStore::new(Bytes::from_static(b"{\"a\":1}"), 64).unwrap();
        assert!(!store.is_spilled());
        assert_eq!(store.json().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_large_body_spills_and_reads_back() {
        let body = serde_json::to_vec(&json!({"blob": "x".repeat(4096)})).unwrap();
        let expected: Value = serde_json::from_slice(&body).unwrap();
        let mut store = PayloadStore::new(Bytes::from(body), 64).unwrap();
        assert!(store.is_spilled());
        assert_eq!(store.json().unwrap(), expected);
        // Re-readable.
        assert_eq!(store.json().unwrap(), expected);
    }

    #[test]
    fn test_parse_error_propagates() {
        let mut store = PayloadStore::new(Bytes::from_static(b"not json"), 64).unwrap();
        assert!(store.json().is_err());
    }
}
