//! XYZ tile addressing on the Web Mercator grid.
//!
//! Covers the three addressing schemes the upstream providers speak:
//! plain `z/x/y` (Google), `z/y/x` REST paths (Esri) and Bing quadkeys,
//! plus the EPSG:3857 bbox used for WMS `GetMap` requests.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// Half the Web Mercator world extent in meters.
pub const WEB_MERCATOR_HALF_EXTENT: f64 = 20037508.34;

/// Deepest zoom level accepted on the HTTP surface.
pub const MAX_ZOOM: u32 = 30;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y), counted from the top
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one axis at this zoom.
    pub fn matrix_size(&self) -> u64 {
        1u64 << self.z.min(63)
    }

    /// True when x and y fall inside `[0, 2^z)`.
    pub fn is_valid(&self) -> bool {
        let n = self.matrix_size();
        (self.x as u64) < n && (self.y as u64) < n
    }

    /// Bing Maps quadkey for this tile.
    ///
    /// One base-4 digit per zoom level, most significant level first; each
    /// digit interleaves the x bit (weight 1) and the y bit (weight 2).
    /// Levels beyond the width of x and y contribute `0` digits.
    pub fn quadkey(&self) -> String {
        let mut key = String::with_capacity(self.z as usize);
        for i in (1..=self.z).rev() {
            let mask = 1u64.checked_shl(i - 1).unwrap_or(0);
            let mut digit = b'0';
            if (self.x as u64) & mask != 0 {
                digit += 1;
            }
            if (self.y as u64) & mask != 0 {
                digit += 2;
            }
            key.push(digit as char);
        }
        key
    }

    /// EPSG:3857 bounding box of this tile.
    ///
    /// Out-of-range x/y are not rejected; they yield a bbox outside the world
    /// extent, which upstream WMS servers answer with an empty or error image.
    pub fn web_mercator_bbox(&self) -> BoundingBox {
        let world = 2.0 * WEB_MERCATOR_HALF_EXTENT;
        let tile = world / self.matrix_size() as f64;

        // Each edge is derived from its own index so neighbours share edges exactly.
        let edge_x = |col: u64| col as f64 * tile - WEB_MERCATOR_HALF_EXTENT;
        let edge_y = |row: u64| WEB_MERCATOR_HALF_EXTENT - row as f64 * tile;

        BoundingBox::new(
            edge_x(self.x as u64),
            edge_y(self.y as u64 + 1),
            edge_x(self.x as u64 + 1),
            edge_y(self.y as u64),
        )
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Convert EPSG:3857 meters to `(lon, lat)` degrees.
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = x / WEB_MERCATOR_HALF_EXTENT * 180.0;
    let lat = (y / WEB_MERCATOR_HALF_EXTENT * std::f64::consts::PI)
        .sinh()
        .atan()
        .to_degrees();
    (lon, lat)
}

/// Convert lat/lon to the Web Mercator tile containing it, clamped to the grid.
pub fn latlon_to_tile(lat: f64, lon: f64, zoom: u32) -> TileCoord {
    let n = (1u64 << zoom.min(MAX_ZOOM)) as f64;
    let max_index = n - 1.0;

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n).floor();

    // NaN (poles, garbage input) lands on 0 through the cast.
    TileCoord {
        z: zoom,
        x: x.clamp(0.0, max_index) as u32,
        y: y.clamp(0.0, max_index) as u32,
    }
}

/// The tile at `zoom` containing the center of an EPSG:3857 bbox.
pub fn bbox_center_tile(bbox: &BoundingBox, zoom: u32) -> TileCoord {
    let (cx, cy) = bbox.center();
    let (lon, lat) = mercator_to_lonlat(cx, cy);
    latlon_to_tile(lat, lon, zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadkey_reference_values() {
        assert_eq!(TileCoord::new(1, 0, 0).quadkey(), "0");
        assert_eq!(TileCoord::new(2, 1, 1).quadkey(), "03");
        assert_eq!(TileCoord::new(3, 3, 5).quadkey(), "213");
        assert_eq!(
            TileCoord::new(16, 35210, 21493).quadkey(),
            "1202102332221212"
        );
        assert_eq!(TileCoord::new(0, 0, 0).quadkey(), "");
    }

    #[test]
    fn test_quadkey_deep_zoom_does_not_overflow() {
        let key = TileCoord::new(70, 1, 2).quadkey();
        assert_eq!(key.len(), 70);
        assert!(key.ends_with("21"));
        assert!(key[..68].bytes().all(|b| b == b'0'));
    }

    #[test]
    fn test_zoom_zero_covers_world() {
        let bbox = TileCoord::new(0, 0, 0).web_mercator_bbox();
        assert_eq!(bbox.min_x, -WEB_MERCATOR_HALF_EXTENT);
        assert_eq!(bbox.max_x, WEB_MERCATOR_HALF_EXTENT);
        assert_eq!(bbox.min_y, -WEB_MERCATOR_HALF_EXTENT);
        assert_eq!(bbox.max_y, WEB_MERCATOR_HALF_EXTENT);
    }

    #[test]
    fn test_bbox_is_deterministic() {
        let tile = TileCoord::new(10, 500, 500);
        assert_eq!(tile.web_mercator_bbox(), tile.web_mercator_bbox());
    }

    #[test]
    fn test_adjacent_tiles_share_edges() {
        for &(z, x, y) in &[(1, 0, 0), (10, 500, 500), (17, 70421, 42987), (22, 3, 4_000_000)] {
            let here = TileCoord::new(z, x, y).web_mercator_bbox();
            let east = TileCoord::new(z, x + 1, y).web_mercator_bbox();
            let south = TileCoord::new(z, x, y + 1).web_mercator_bbox();
            assert_eq!(here.max_x, east.min_x);
            assert_eq!(here.min_y, south.max_y);
        }
    }

    #[test]
    fn test_tile_size_halves_per_zoom() {
        let z3 = TileCoord::new(3, 2, 2).web_mercator_bbox();
        let z4 = TileCoord::new(4, 4, 4).web_mercator_bbox();
        assert!((z3.width() - 2.0 * z4.width()).abs() < 1e-6);
        assert!((z3.height() - z3.width()).abs() < 1e-6);
    }

    #[test]
    fn test_is_valid() {
        assert!(TileCoord::new(0, 0, 0).is_valid());
        assert!(!TileCoord::new(0, 1, 0).is_valid());
        assert!(TileCoord::new(10, 1023, 1023).is_valid());
        assert!(!TileCoord::new(10, 1024, 5).is_valid());
    }

    #[test]
    fn test_latlon_to_tile() {
        let coord = latlon_to_tile(0.0, 0.0, 0);
        assert_eq!(coord, TileCoord::new(0, 0, 0));

        // Goiânia, zoom 10
        let coord = latlon_to_tile(-16.6869, -49.2648, 10);
        assert_eq!(coord.z, 10);
        assert!(coord.x > 360 && coord.x < 375);
        assert!(coord.y > 550 && coord.y < 565);
    }

    #[test]
    fn test_latlon_to_tile_clamps() {
        let coord = latlon_to_tile(89.99, 179.999, 2);
        assert_eq!(coord, TileCoord::new(2, 3, 0));
        let coord = latlon_to_tile(-89.99, -180.0, 2);
        assert_eq!(coord, TileCoord::new(2, 0, 3));
    }

    #[test]
    fn test_bbox_center_tile_recovers_tile() {
        let tile = TileCoord::new(15, 11812, 18004);
        let bbox = tile.web_mercator_bbox();
        assert_eq!(bbox_center_tile(&bbox, 15), tile);
    }

    #[test]
    fn test_mercator_to_lonlat_origin() {
        let (lon, lat) = mercator_to_lonlat(0.0, 0.0);
        assert_eq!(lon, 0.0);
        assert_eq!(lat, 0.0);
        let (lon, _) = mercator_to_lonlat(WEB_MERCATOR_HALF_EXTENT, 0.0);
        assert!((lon - 180.0).abs() < 1e-9);
    }
}
