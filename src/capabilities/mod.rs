//! Capability payload parsing and merging.
//!
//! A new-session request arrives in up to three parts: a legacy flat
//! `desiredCapabilities` mapping, a W3C `alwaysMatch` mapping, and an
//! ordered list of W3C `firstMatch` mappings. This module validates the
//! document and turns it into the ordered candidate capability sets the
//! session factory pipeline matches against. Pure data transformation; the
//! only I/O lives in [`PayloadStore`], which spills oversized bodies to a
//! temp file.

pub mod caps;
pub mod payload;
pub mod store;

pub use caps::{is_accepted_w3c_key, is_vendor_key, Capabilities, W3C_ACCEPTED_KEYS};
pub use payload::NewSessionPayload;
pub use store::{PayloadStore, DEFAULT_SPILL_THRESHOLD};
