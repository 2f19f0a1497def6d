//! Image production for the tile proxy.
//!
//! - PNG encoding (indexed and RGBA)
//! - Placeholder tiles, static and procedural
//! - Magic-byte format detection for upstream payloads

pub mod format;
pub mod placeholder;
pub mod png;

pub use format::sniff_content_type;
pub use placeholder::{procedural_index_tile, static_tile, StaticTile};
