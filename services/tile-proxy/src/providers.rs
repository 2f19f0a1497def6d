//! Upstream imagery providers and the fallback chain for each tile route.

use reqwest::Url;
use std::fmt;
use std::time::Duration;

use renderer::StaticTile;
use tile_common::{BoundingBox, DateRange, ImageryKind, Product, TileCoord};

use crate::config::{Endpoints, Timeouts};

pub const WMS_TILE_SIZE: u32 = 256;

/// An upstream imagery source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Copernicus Sentinel Hub WMS. The only source of real index data.
    Copernicus,
    Google,
    Bing,
    Esri,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Copernicus => "copernicus",
            Provider::Google => "google",
            Provider::Bing => "bing",
            Provider::Esri => "esri",
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Provider::Copernicus)
    }

    /// Freshness policy for tiles served from this provider.
    ///
    /// Copernicus tiles track a moving date window and revalidate quickly;
    /// basemap imagery changes rarely.
    pub fn cache_control(&self) -> &'static str {
        match self {
            Provider::Copernicus => "public, max-age=300, must-revalidate",
            Provider::Google => "public, max-age=86400",
            Provider::Bing | Provider::Esri => "public, max-age=604800",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a provider needs to address one tile.
#[derive(Debug, Clone)]
pub struct TileRequest {
    pub kind: ImageryKind,
    pub coord: TileCoord,
    pub bbox: BoundingBox,
    pub date_range: DateRange,
}

impl TileRequest {
    pub fn new(kind: ImageryKind, coord: TileCoord, date_range: DateRange) -> Self {
        Self {
            kind,
            coord,
            bbox: coord.web_mercator_bbox(),
            date_range,
        }
    }
}

/// One entry of a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub provider: Provider,
    pub timeout: Duration,
}

impl ProviderDescriptor {
    /// Upstream URL for this provider and tile.
    pub fn build_url(&self, endpoints: &Endpoints, request: &TileRequest) -> String {
        match self.provider {
            Provider::Copernicus => copernicus_getmap_url(endpoints, request),
            Provider::Google => fill_template(&endpoints.google_tile_url, &request.coord),
            Provider::Bing => fill_template(&endpoints.bing_tile_url, &request.coord),
            Provider::Esri => fill_template(&endpoints.esri_tile_url, &request.coord),
        }
    }
}

/// What to serve once the chain is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// Compiled-in asset for the imagery kind.
    Static,
    /// Procedural 256x256 index tile keyed by the coordinate.
    Procedural,
}

/// Provider order and terminal placeholder for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    pub providers: Vec<ProviderDescriptor>,
    pub placeholder: PlaceholderKind,
}

/// Fallback chain for `(kind, product)`.
///
/// - satellite: Copernicus TCI, Google, Bing, gray JPEG
/// - index tiles: Copernicus index, Esri, Google, flat colour PNG
/// - index visual: Copernicus index, procedural PNG
pub fn fallback_chain(kind: ImageryKind, product: Product, timeouts: &Timeouts) -> FallbackChain {
    let primary = ProviderDescriptor {
        provider: Provider::Copernicus,
        timeout: timeouts.primary,
    };
    let fallback = |provider| ProviderDescriptor {
        provider,
        timeout: timeouts.fallback,
    };

    match (kind, product) {
        (ImageryKind::Satellite, _) => FallbackChain {
            providers: vec![primary, fallback(Provider::Google), fallback(Provider::Bing)],
            placeholder: PlaceholderKind::Static,
        },
        (_, Product::Tiles) => FallbackChain {
            providers: vec![primary, fallback(Provider::Esri), fallback(Provider::Google)],
            placeholder: PlaceholderKind::Static,
        },
        (_, Product::Visual) => FallbackChain {
            providers: vec![primary],
            placeholder: PlaceholderKind::Procedural,
        },
    }
}

/// Static placeholder asset for a kind.
pub fn static_placeholder(kind: ImageryKind) -> StaticTile {
    renderer::static_tile(kind)
}

/// WMS 1.3.0 `GetMap` for one 256px tile of a kind's Sentinel-2 layer.
pub fn copernicus_getmap_url(endpoints: &Endpoints, request: &TileRequest) -> String {
    let mut url = endpoints.wms_url.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("service", "WMS")
            .append_pair("version", "1.3.0")
            .append_pair("request", "GetMap")
            .append_pair("layers", request.kind.copernicus_layer())
            .append_pair("format", request.kind.mime_type())
            .append_pair("srs", "EPSG:3857")
            .append_pair("width", &WMS_TILE_SIZE.to_string())
            .append_pair("height", &WMS_TILE_SIZE.to_string())
            .append_pair("bbox", &request.bbox.to_wms_string())
            .append_pair("time", &request.date_range.to_wms_time());
        if let Some(colormap) = request.kind.colormap() {
            query.append_pair("colormap", colormap);
        }
    }
    url.into()
}

/// Ad-hoc WMS `GetMap` passthrough parameters.
#[derive(Debug, Clone)]
pub struct WmsPassthrough {
    pub layers: String,
    pub bbox: BoundingBox,
    pub width: u32,
    pub height: u32,
    pub srs: String,
    pub colormap: Option<String>,
    pub time: Option<String>,
}

pub fn copernicus_passthrough_url(wms_url: &Url, params: &WmsPassthrough) -> String {
    let mut url = wms_url.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("service", "WMS")
            .append_pair("version", "1.3.0")
            .append_pair("request", "GetMap")
            .append_pair("layers", &params.layers)
            .append_pair("format", "image/png")
            .append_pair("srs", &params.srs)
            .append_pair("width", &params.width.to_string())
            .append_pair("height", &params.height.to_string())
            .append_pair("bbox", &params.bbox.to_wms_string());
        if let Some(colormap) = &params.colormap {
            query.append_pair("colormap", colormap);
        }
        if let Some(time) = &params.time {
            query.append_pair("time", time);
        }
    }
    url.into()
}

/// WMS `GetCapabilities`, used as a liveness probe.
pub fn copernicus_capabilities_url(wms_url: &Url) -> String {
    let mut url = wms_url.clone();
    url.query_pairs_mut()
        .append_pair("service", "WMS")
        .append_pair("request", "GetCapabilities");
    url.into()
}

/// Substitute `{z}`, `{x}`, `{y}` and `{quadkey}` in a tile URL template.
pub fn fill_template(template: &str, coord: &TileCoord) -> String {
    let mut url = template
        .replace("{z}", &coord.z.to_string())
        .replace("{x}", &coord.x.to_string())
        .replace("{y}", &coord.y.to_string());
    if url.contains("{quadkey}") {
        url = url.replace("{quadkey}", &coord.quadkey());
    }
    url
}
