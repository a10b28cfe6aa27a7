//! Protocol converter / passthrough.
//!
//! Once a session is established, every command must reach the upstream
//! endpoint in the dialect it speaks and come back in the dialect the
//! client speaks. When the two match, forwarding is byte-level (headers
//! minus a fixed hop-by-hop set); when they differ, each request is decoded,
//! re-encoded, and its element references rewritten between the dialects'
//! key names.

pub mod converter;

pub use converter::{
    is_hop_by_hop, rewrite_element_keys, strip_hop_by_hop, ProtocolConverter, HOP_BY_HOP_HEADERS,
};
