//! Health and upstream status handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Extension, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use tile_common::TileCoord;

use crate::providers::{copernicus_capabilities_url, fill_template};
use crate::state::AppState;
use crate::upstream::UpstreamClient;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Reachability of each upstream, as seen from this service.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub copernicus: String,
    pub esri: String,
    pub credentials_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    pub timestamp: String,
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// GET /sentinel2/status
pub async fn status_handler(Extension(state): Extension<Arc<AppState>>) -> Json<StatusResponse> {
    let endpoints = &state.config.endpoints;
    let timeouts = state.config.timeouts;

    let copernicus_url = copernicus_capabilities_url(&endpoints.wms_url);
    let esri_url = fill_template(&endpoints.esri_tile_url, &TileCoord::new(1, 1, 1));

    let copernicus = async {
        let token = state.auth.get_auth_token().await;
        probe(state.client.as_ref(), &copernicus_url, token.as_deref(), timeouts.primary).await
    };
    let esri = probe(state.client.as_ref(), &esri_url, None, timeouts.fallback);
    let (copernicus, esri) = tokio::join!(copernicus, esri);

    Json(StatusResponse {
        copernicus,
        esri,
        credentials_configured: state.auth.has_credentials(),
        api_url: state.config.public_api_url.clone(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// `ok`, `error-<status>` or `offline`.
async fn probe(
    client: &dyn UpstreamClient,
    url: &str,
    bearer: Option<&str>,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, client.get(url, bearer)).await {
        Ok(Ok(response)) if response.is_success() => "ok".to_string(),
        Ok(Ok(response)) => format!("error-{}", response.status),
        Ok(Err(e)) => {
            debug!(url = %url, error = %e, "Status probe failed");
            "offline".to_string()
        }
        Err(_) => {
            debug!(url = %url, "Status probe timed out");
            "offline".to_string()
        }
    }
}
