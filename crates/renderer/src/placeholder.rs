//! Placeholder tiles returned when every upstream provider fails.
//!
//! Two flavours exist:
//! - static assets compiled into the binary, one per imagery kind;
//! - a procedural 256x256 index tile whose colour is derived from the tile
//!   coordinate, so neighbouring placeholders are visually distinguishable.

use crate::png::{self, PngError};
use tile_common::{ImageryKind, TileCoord};

pub const TILE_SIZE: usize = 256;

/// Alpha of procedural tiles, so they read as an overlay.
const OVERLAY_ALPHA: u8 = 200;

static GRAY_JPEG: &[u8] = include_bytes!("../assets/placeholder_gray.jpg");
static NDVI_PNG: &[u8] = include_bytes!("../assets/placeholder_ndvi.png");
static NDMI_PNG: &[u8] = include_bytes!("../assets/placeholder_ndmi.png");
static NDBI_PNG: &[u8] = include_bytes!("../assets/placeholder_ndbi.png");

/// A compiled-in placeholder image.
#[derive(Debug, Clone, Copy)]
pub struct StaticTile {
    pub bytes: &'static [u8],
    pub content_type: &'static str,
}

/// Static placeholder for a kind: gray JPEG for true colour, a flat
/// translucent PNG for each index.
pub fn static_tile(kind: ImageryKind) -> StaticTile {
    match kind {
        ImageryKind::Satellite => StaticTile {
            bytes: GRAY_JPEG,
            content_type: "image/jpeg",
        },
        ImageryKind::Ndvi => StaticTile {
            bytes: NDVI_PNG,
            content_type: "image/png",
        },
        ImageryKind::Ndmi => StaticTile {
            bytes: NDMI_PNG,
            content_type: "image/png",
        },
        ImageryKind::Ndbi => StaticTile {
            bytes: NDBI_PNG,
            content_type: "image/png",
        },
    }
}

/// Spatial hash of a tile coordinate.
pub fn tile_seed(coord: &TileCoord) -> u32 {
    coord.z.wrapping_mul(73_856_093)
        ^ coord.x.wrapping_mul(19_349_663)
        ^ coord.y.wrapping_mul(83_492_791)
}

/// Pick the base colour for a kind from a value in `[0, 1)`.
pub fn base_color(kind: ImageryKind, r: f64) -> [u8; 3] {
    let ch = |base: f64, span: f64| (base + r * span).floor() as u8;
    match kind {
        // bare soil, transition, vegetation
        ImageryKind::Ndvi | ImageryKind::Satellite => {
            if r < 0.3 {
                [ch(200.0, 55.0), ch(100.0, 30.0), ch(50.0, 20.0)]
            } else if r < 0.6 {
                [ch(200.0, 55.0), ch(180.0, 75.0), ch(50.0, 20.0)]
            } else {
                [ch(50.0, 50.0), ch(150.0, 100.0), ch(50.0, 50.0)]
            }
        }
        // dry, moderate, wet
        ImageryKind::Ndmi => {
            if r < 0.33 {
                [ch(160.0, 60.0), ch(120.0, 40.0), ch(80.0, 40.0)]
            } else if r < 0.66 {
                [ch(100.0, 80.0), ch(150.0, 100.0), ch(180.0, 75.0)]
            } else {
                [ch(50.0, 80.0), ch(150.0, 100.0), ch(180.0, 75.0)]
            }
        }
        // rural, built-up
        ImageryKind::Ndbi => {
            if r < 0.5 {
                let v = ch(150.0, 60.0);
                [v, v, v]
            } else {
                let v = ch(50.0, 100.0);
                [v, v, v]
            }
        }
    }
}

/// Base colour of the procedural tile at `coord`.
pub fn dominant_color(kind: ImageryKind, coord: &TileCoord) -> [u8; 3] {
    let r = (tile_seed(coord) % 256) as f64 / 256.0;
    base_color(kind, r)
}

/// Raw RGBA pixels of the procedural tile, row-major.
pub fn index_tile_pixels(kind: ImageryKind, coord: &TileCoord) -> Vec<u8> {
    let base = dominant_color(kind, coord);
    let mut pixels = Vec::with_capacity(TILE_SIZE * TILE_SIZE * 4);

    for row in 0..TILE_SIZE {
        for col in 0..TILE_SIZE {
            // diagonal ripple in [-15, 15)
            let variation = ((row + col) % 256) as f64 / 256.0;
            let shift = variation * 30.0 - 15.0;
            for channel in base {
                pixels.push((channel as f64 + shift).floor().clamp(0.0, 255.0) as u8);
            }
            pixels.push(OVERLAY_ALPHA);
        }
    }

    pixels
}

/// Procedural index tile encoded as PNG.
pub fn procedural_index_tile(kind: ImageryKind, coord: &TileCoord) -> Result<Vec<u8>, PngError> {
    let pixels = index_tile_pixels(kind, coord);
    png::encode_auto(&pixels, TILE_SIZE, TILE_SIZE)
}
