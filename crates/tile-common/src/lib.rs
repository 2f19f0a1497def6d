//! Common types and utilities shared by the Sentinel-2 tile proxy crates.

pub mod bbox;
pub mod error;
pub mod imagery;
pub mod tile;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{ProxyError, ProxyResult};
pub use imagery::{parse_layer, ImageryKind, Product};
pub use tile::TileCoord;
pub use time::DateRange;
