//! XYZ tile endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Path},
    http::{header, HeaderName, HeaderValue},
    response::Response,
};
use tracing::{debug, warn};

use tile_common::tile::MAX_ZOOM;
use tile_common::{parse_layer, ImageryKind, ProxyError, ProxyResult, TileCoord};

use super::ApiError;
use crate::resolver::ResolvedTile;
use crate::state::AppState;

const X_TILE_SOURCE: HeaderName = HeaderName::from_static("x-tile-source");
const X_PLACEHOLDER: HeaderName = HeaderName::from_static("x-placeholder");
const X_FALLBACK: HeaderName = HeaderName::from_static("x-fallback");
const X_TILE_DATE: HeaderName = HeaderName::from_static("x-tile-date");
const X_TILE_ATTEMPTS: HeaderName = HeaderName::from_static("x-tile-attempts");

/// GET /sentinel2/{kind}-{tiles|visual}/{z}/{x}/{y}.{ext}
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((layer, z, x, y)): Path<(String, String, String, String)>,
) -> Result<Response, ApiError> {
    let (kind, product) =
        parse_layer(&layer).ok_or_else(|| ProxyError::LayerNotFound(layer.clone()))?;
    let coord = parse_tile_path(kind, &z, &x, &y)?;

    debug!(kind = %kind, product = product.as_str(), tile = %coord, "Tile request");
    if !coord.is_valid() {
        warn!(tile = %coord, "Tile outside the zoom level's matrix, resolving anyway");
    }

    let tile = state.resolver.resolve_tile(kind, product, coord).await;
    Ok(tile_response(tile))
}

/// Parse `z`, `x` and `y[.ext]` path segments.
///
/// The extension, when present, must be the kind's own (`jpg`, or its
/// `jpeg` spelling, for satellite; `png` for indices). It never selects the
/// served format.
pub fn parse_tile_path(kind: ImageryKind, z: &str, x: &str, y_ext: &str) -> ProxyResult<TileCoord> {
    let y = match y_ext.rsplit_once('.') {
        Some((y, ext)) => {
            let ext = ext.to_ascii_lowercase();
            let canonical = if ext == "jpeg" { "jpg" } else { ext.as_str() };
            if canonical != kind.extension() {
                return Err(ProxyError::NotFound(format!(
                    "{} tiles are served as .{}, not .{}",
                    kind,
                    kind.extension(),
                    ext
                )));
            }
            y
        }
        None => y_ext,
    };

    let parse = |name: &str, value: &str| -> ProxyResult<u32> {
        value.parse::<u32>().map_err(|_| ProxyError::InvalidParameter {
            param: name.to_string(),
            message: format!("'{}' is not a non-negative integer", value),
        })
    };

    let coord = TileCoord::new(parse("z", z)?, parse("x", x)?, parse("y", y)?);
    if coord.z > MAX_ZOOM {
        return Err(ProxyError::InvalidTile(format!(
            "zoom {} exceeds maximum {}",
            coord.z, MAX_ZOOM
        )));
    }
    Ok(coord)
}

/// Render a resolved tile with its caching and provenance headers.
pub fn tile_response(tile: ResolvedTile) -> Response {
    let mut response = Response::new(Body::from(tile.bytes.clone()));
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&tile.content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(tile.cache_control));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(X_TILE_SOURCE, HeaderValue::from_static(tile.source.as_str()));
    headers.insert(X_PLACEHOLDER, bool_header(tile.is_placeholder()));
    headers.insert(X_FALLBACK, bool_header(tile.is_fallback()));
    headers.insert(X_TILE_ATTEMPTS, HeaderValue::from(tile.attempts.len()));

    if let Some(range) = tile.date_range {
        if let Ok(value) = HeaderValue::from_str(&range.to_wms_time()) {
            headers.insert(X_TILE_DATE, value);
        }
    }

    response
}

fn bool_header(value: bool) -> HeaderValue {
    HeaderValue::from_static(if value { "true" } else { "false" })
}
