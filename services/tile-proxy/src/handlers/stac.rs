//! STAC catalogue search relay.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use tile_common::{ProxyError, ProxyResult};

use super::ApiError;
use crate::state::AppState;

const DEFAULT_COLLECTION: &str = "sentinel-2";
const DEFAULT_LIMIT: u32 = 1;

/// Body accepted from the dashboard.
#[derive(Debug, Deserialize)]
pub struct StacSearchRequest {
    pub bbox: Option<Value>,
    pub datetime: Option<String>,
    pub collections: Option<Vec<String>>,
    pub limit: Option<u32>,
}

/// Body forwarded to `{stac}/search`.
#[derive(Debug, Serialize, PartialEq)]
pub struct StacSearchPayload {
    pub collections: Vec<String>,
    pub bbox: Value,
    pub datetime: String,
    pub limit: u32,
}

impl StacSearchRequest {
    pub fn into_payload(self) -> ProxyResult<StacSearchPayload> {
        let bbox = self
            .bbox
            .filter(|b| !b.is_null())
            .ok_or_else(|| ProxyError::MissingParameter("bbox".to_string()))?;
        let datetime = self
            .datetime
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ProxyError::MissingParameter("datetime".to_string()))?;

        Ok(StacSearchPayload {
            collections: self
                .collections
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| vec![DEFAULT_COLLECTION.to_string()]),
            bbox,
            datetime,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

/// POST /sentinel2/stac-search
#[instrument(skip_all)]
pub async fn stac_search_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<StacSearchRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.map_err(|rejection| ProxyError::InvalidParameter {
        param: "body".to_string(),
        message: rejection.body_text(),
    })?;
    let payload = request.into_payload()?;
    let url = format!("{}/search", state.config.endpoints.stac_api_url);
    let body = serde_json::to_value(&payload).map_err(ProxyError::from)?;

    let response = state.client.post_json(&url, &body).await.map_err(|e| {
        warn!(error = %e, "STAC search unreachable");
        ProxyError::BadGateway(format!("STAC API unreachable: {}", e))
    })?;

    if !response.is_success() {
        warn!(status = response.status, "STAC search rejected");
        return Err(ProxyError::Upstream {
            status: response.status,
            message: format!("STAC API error: {}", response.status),
        }
        .into());
    }

    let results: Value = serde_json::from_slice(&response.body).map_err(|e| {
        ProxyError::BadGateway(format!("STAC API returned invalid JSON: {}", e))
    })?;

    let matched = results
        .get("features")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    info!(features = matched, datetime = %payload.datetime, "STAC search relayed");

    Ok(Json(results))
}
