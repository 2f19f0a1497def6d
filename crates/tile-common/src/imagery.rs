//! Imagery kinds served by the proxy and their upstream parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The imagery kinds the dashboard overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageryKind {
    /// True-colour Sentinel-2 composite.
    Satellite,
    /// Normalized Difference Vegetation Index.
    Ndvi,
    /// Normalized Difference Moisture Index.
    Ndmi,
    /// Normalized Difference Built-up Index.
    Ndbi,
}

impl ImageryKind {
    pub const ALL: [ImageryKind; 4] = [
        ImageryKind::Satellite,
        ImageryKind::Ndvi,
        ImageryKind::Ndmi,
        ImageryKind::Ndbi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageryKind::Satellite => "satellite",
            ImageryKind::Ndvi => "ndvi",
            ImageryKind::Ndmi => "ndmi",
            ImageryKind::Ndbi => "ndbi",
        }
    }

    /// Copernicus WMS layer name.
    pub fn copernicus_layer(&self) -> &'static str {
        match self {
            ImageryKind::Satellite => "SENTINEL2_L2A.TCI",
            ImageryKind::Ndvi => "SENTINEL2_L2A.NDVI",
            ImageryKind::Ndmi => "SENTINEL2_L2A.NDMI",
            ImageryKind::Ndbi => "SENTINEL2_L2A.NDBI",
        }
    }

    /// Colormap applied server-side by Copernicus. True colour has none.
    pub fn colormap(&self) -> Option<&'static str> {
        match self {
            ImageryKind::Satellite => None,
            ImageryKind::Ndvi => Some("viridis"),
            ImageryKind::Ndmi => Some("blues"),
            ImageryKind::Ndbi => Some("greys"),
        }
    }

    /// MIME type requested from the WMS and assumed when nothing better is known.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageryKind::Satellite => "image/jpeg",
            _ => "image/png",
        }
    }

    /// File extension used on the tile routes.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageryKind::Satellite => "jpg",
            _ => "png",
        }
    }

    pub fn is_index(&self) -> bool {
        !matches!(self, ImageryKind::Satellite)
    }
}

impl fmt::Display for ImageryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "satellite" => Ok(ImageryKind::Satellite),
            "ndvi" => Ok(ImageryKind::Ndvi),
            "ndmi" => Ok(ImageryKind::Ndmi),
            "ndbi" => Ok(ImageryKind::Ndbi),
            other => Err(format!("unknown imagery kind: {}", other)),
        }
    }
}

/// Which product family a tile route serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    /// `{kind}-tiles`: full provider chain ending in a static placeholder.
    Tiles,
    /// `{kind}-visual`: Copernicus only, then a procedural index tile.
    Visual,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Tiles => "tiles",
            Product::Visual => "visual",
        }
    }
}

/// Split a route layer segment such as `ndvi-tiles` into kind and product.
///
/// Visual products only exist for the index kinds.
pub fn parse_layer(segment: &str) -> Option<(ImageryKind, Product)> {
    let (kind, product) = segment.rsplit_once('-')?;
    let kind: ImageryKind = kind.parse().ok()?;
    let product = match product {
        "tiles" => Product::Tiles,
        "visual" if kind.is_index() => Product::Visual,
        _ => return None,
    };
    Some((kind, product))
}
