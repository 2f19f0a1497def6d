//! Ad-hoc WMS `GetMap` proxy.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use tile_common::{BoundingBox, ProxyError, ProxyResult};

use super::tiles::tile_response;
use super::ApiError;
use crate::providers::WmsPassthrough;
use crate::state::AppState;

const DEFAULT_SIZE: u32 = 512;
const MAX_SIZE: u32 = 4096;
const DEFAULT_SRS: &str = "EPSG:3857";

#[derive(Debug, Deserialize)]
pub struct WmsQuery {
    pub layers: Option<String>,
    pub bbox: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub srs: Option<String>,
    pub crs: Option<String>,
    pub colormap: Option<String>,
    pub time: Option<String>,
}

impl WmsQuery {
    pub fn into_passthrough(self) -> ProxyResult<WmsPassthrough> {
        let layers = self
            .layers
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| ProxyError::MissingParameter("layers".to_string()))?;
        let bbox = self
            .bbox
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| ProxyError::MissingParameter("bbox".to_string()))?;
        let bbox = BoundingBox::from_wms_string(&bbox)?;

        let width = check_size("width", self.width.unwrap_or(DEFAULT_SIZE))?;
        let height = check_size("height", self.height.unwrap_or(DEFAULT_SIZE))?;

        Ok(WmsPassthrough {
            layers,
            bbox,
            width,
            height,
            srs: self
                .srs
                .or(self.crs)
                .unwrap_or_else(|| DEFAULT_SRS.to_string()),
            colormap: self.colormap,
            time: self.time,
        })
    }
}

fn check_size(param: &str, value: u32) -> ProxyResult<u32> {
    if value == 0 || value > MAX_SIZE {
        return Err(ProxyError::InvalidParameter {
            param: param.to_string(),
            message: format!("must be between 1 and {}", MAX_SIZE),
        });
    }
    Ok(value)
}

/// GET /sentinel2/wms
pub async fn wms_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<WmsQuery>,
) -> Result<Response, ApiError> {
    let params = query.into_passthrough()?;

    match state.resolver.resolve_wms(&params).await {
        Some(tile) => Ok(tile_response(tile)),
        None => {
            warn!(layers = %params.layers, bbox = %params.bbox.to_wms_string(), "WMS request failed on every provider");
            Ok((
                StatusCode::BAD_GATEWAY,
                "Failed to fetch imagery from Copernicus and fallback providers",
            )
                .into_response())
        }
    }
}
