//! HTTP request handlers for the tile proxy.

pub mod health;
pub mod stac;
pub mod tiles;
pub mod wms;

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use tile_common::ProxyError;

use crate::state::AppState;

/// Build the full application router.
///
/// The Sentinel-2 routes are served under both `/sentinel2` and
/// `/api/sentinel2`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/sentinel2", sentinel_routes())
        .nest("/api/sentinel2", sentinel_routes())
        .route("/health", get(health::health_handler))
        .fallback(not_found_handler)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

fn sentinel_routes() -> Router {
    Router::new()
        .route("/stac-search", post(stac::stac_search_handler))
        .route("/wms", get(wms::wms_handler))
        .route("/status", get(health::status_handler))
        .route("/:layer/:z/:x/:y", get(tiles::tile_handler))
}

async fn not_found_handler() -> ApiError {
    ApiError(ProxyError::NotFound("no such endpoint".to_string()))
}

/// A [`ProxyError`] rendered as a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError(pub ProxyError);

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        debug!(status = status.as_u16(), error = %self.0, "Request failed");

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
