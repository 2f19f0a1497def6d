//! End-to-end tests of the HTTP surface against scripted upstreams.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use reqwest::Url;
use serde_json::{json, Value};
use tower::ServiceExt;

use tile_proxy::auth::InMemoryTokenCache;
use tile_proxy::config::{Endpoints, ProxyConfig};
use tile_proxy::upstream::{FetchError, UpstreamClient, UpstreamResponse};
use tile_proxy::{build_router, AppState};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

#[derive(Clone)]
enum Reply {
    Status(u16, &'static str, &'static [u8]),
}

/// Upstream double answering by URL prefix. Unmatched URLs are unreachable.
struct FakeUpstream {
    rules: Vec<(&'static str, Reply)>,
    calls: Mutex<Vec<String>>,
}

impl FakeUpstream {
    fn new(rules: &[(&'static str, Reply)]) -> Arc<Self> {
        Arc::new(Self {
            rules: rules.to_vec(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn reply(&self, url: &str) -> Result<UpstreamResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let rule = self.rules.iter().find(|(prefix, _)| url.starts_with(prefix));
        match rule.map(|(_, reply)| reply) {
            Some(Reply::Status(status, content_type, body)) => {
                Ok(UpstreamResponse::new(*status, Some(*content_type), *body))
            }
            None => Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    async fn get(&self, url: &str, _bearer: Option<&str>) -> Result<UpstreamResponse, FetchError> {
        self.reply(url)
    }

    async fn post_form(&self, url: &str, _: &[(&str, &str)]) -> Result<UpstreamResponse, FetchError> {
        self.reply(url)
    }

    async fn post_json(&self, url: &str, _: &Value) -> Result<UpstreamResponse, FetchError> {
        self.reply(url)
    }
}

fn test_config() -> ProxyConfig {
    ProxyConfig {
        endpoints: Endpoints {
            token_url: "http://identity.test/token".to_string(),
            wms_url: Url::parse("http://wms.test/wms").unwrap(),
            stac_api_url: "http://stac.test/api".to_string(),
            google_tile_url: "http://google.test/{z}/{x}/{y}".to_string(),
            bing_tile_url: "http://bing.test/a{quadkey}.jpeg".to_string(),
            esri_tile_url: "http://esri.test/tile/{z}/{y}/{x}".to_string(),
        },
        public_api_url: Some("http://localhost:3001".to_string()),
        ..ProxyConfig::default()
    }
}

fn app(upstream: Arc<FakeUpstream>) -> Router {
    let state = AppState::with_client(test_config(), upstream, Arc::new(InMemoryTokenCache::new()));
    build_router(Arc::new(state))
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_str<'a>(response: &'a Response, name: &str) -> &'a str {
    response.headers()[name].to_str().unwrap()
}

#[tokio::test]
async fn test_ndvi_tile_with_every_provider_down_is_a_placeholder() {
    let upstream = FakeUpstream::new(&[]);
    let response = get(app(upstream.clone()), "/sentinel2/ndvi-tiles/10/500/500.png").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "image/png");
    assert_eq!(header_str(&response, "x-placeholder"), "true");
    assert_eq!(header_str(&response, "x-tile-source"), "placeholder");
    assert_eq!(header_str(&response, "access-control-allow-origin"), "*");
    assert_eq!(header_str(&response, "cache-control"), "public, max-age=86400");
    assert!(!body_bytes(response).await.is_empty());

    // Copernicus, Esri, Google in that order.
    let calls = upstream.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].starts_with("http://wms.test/wms"));
    assert!(calls[1].starts_with("http://esri.test/tile/10/500/500"));
    assert!(calls[2].starts_with("http://google.test/10/500/500"));
}

#[tokio::test]
async fn test_satellite_tile_from_copernicus() {
    let upstream = FakeUpstream::new(&[("http://wms.test/", Reply::Status(200, "image/jpeg", JPEG))]);
    let response = get(app(upstream.clone()), "/api/sentinel2/satellite-tiles/12/2154/1434.jpg").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "image/jpeg");
    assert_eq!(header_str(&response, "x-tile-source"), "copernicus");
    assert_eq!(header_str(&response, "x-fallback"), "false");
    assert_eq!(header_str(&response, "x-placeholder"), "false");
    assert_eq!(header_str(&response, "cache-control"), "public, max-age=300, must-revalidate");
    assert!(response.headers().contains_key("x-tile-date"));
    assert_eq!(body_bytes(response).await, JPEG);
    assert_eq!(upstream.calls().len(), 1);
}

#[tokio::test]
async fn test_satellite_falls_back_to_bing() {
    let upstream = FakeUpstream::new(&[
        ("http://wms.test/", Reply::Status(503, "text/plain", b"busy")),
        ("http://google.test/", Reply::Status(403, "text/html", b"denied")),
        ("http://bing.test/", Reply::Status(200, "image/jpeg", JPEG)),
    ]);
    let response = get(app(upstream.clone()), "/sentinel2/satellite-tiles/2/1/1.jpg").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-tile-source"), "bing");
    assert_eq!(header_str(&response, "x-fallback"), "true");
    assert_eq!(header_str(&response, "cache-control"), "public, max-age=604800");
    assert_eq!(upstream.calls()[2], "http://bing.test/a03.jpeg");
}

#[tokio::test]
async fn test_visual_tile_is_procedural_png() {
    let upstream = FakeUpstream::new(&[]);
    let first = get(app(upstream.clone()), "/sentinel2/ndmi-visual/8/130/90.png").await;
    let second = get(app(upstream.clone()), "/sentinel2/ndmi-visual/8/130/90.png").await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header_str(&first, "content-type"), "image/png");
    assert_eq!(header_str(&first, "x-placeholder"), "true");

    let first = body_bytes(first).await;
    assert_eq!(&first[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(first, body_bytes(second).await);
}

#[tokio::test]
async fn test_malformed_tile_paths() {
    let upstream = FakeUpstream::new(&[]);

    let response = get(app(upstream.clone()), "/sentinel2/ndvi-tiles/x/1/1.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].as_str().is_some());

    let response = get(app(upstream.clone()), "/sentinel2/ndvi-tiles/31/0/0.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(app(upstream.clone()), "/sentinel2/evi-tiles/1/0/0.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(app(upstream.clone()), "/sentinel2/satellite-visual/1/0/0.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let response = get(app(FakeUpstream::new(&[])), "/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_wms_passthrough() {
    let upstream = FakeUpstream::new(&[("http://wms.test/", Reply::Status(200, "image/png", PNG))]);
    let response = get(
        app(upstream.clone()),
        "/sentinel2/wms?layers=NDVI&bbox=0,0,1000,1000&colormap=viridis",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "image/png");
    assert_eq!(header_str(&response, "x-tile-source"), "copernicus");

    let url = Url::parse(&upstream.calls()[0]).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("width".into(), "512".into())));
    assert!(pairs.contains(&("srs".into(), "EPSG:3857".into())));
    assert!(pairs.contains(&("colormap".into(), "viridis".into())));
}

#[tokio::test]
async fn test_wms_falls_back_to_esri_then_502() {
    let upstream = FakeUpstream::new(&[("http://esri.test/", Reply::Status(200, "image/jpeg", JPEG))]);
    let response = get(app(upstream.clone()), "/sentinel2/wms?layers=NDVI&bbox=0,0,1000,1000").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-tile-source"), "esri");
    assert!(upstream.calls()[1].starts_with("http://esri.test/tile/15/"));

    let response = get(app(FakeUpstream::new(&[])), "/sentinel2/wms?layers=NDVI&bbox=0,0,1000,1000").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_wms_requires_layers_and_bbox() {
    let response = get(app(FakeUpstream::new(&[])), "/sentinel2/wms?layers=NDVI").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("bbox"));
}

#[tokio::test]
async fn test_stac_search_relays_results() {
    let upstream = FakeUpstream::new(&[(
        "http://stac.test/api/search",
        Reply::Status(200, "application/json", br#"{"type":"FeatureCollection","features":[{"id":"S2A"}]}"#),
    )]);
    let response = post_json(
        app(upstream),
        "/sentinel2/stac-search",
        json!({ "bbox": [10, 45, 11, 46], "datetime": "2025-06-01/2025-06-10" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["features"][0]["id"], "S2A");
}

#[tokio::test]
async fn test_stac_search_errors() {
    let body = json!({ "bbox": [10, 45, 11, 46], "datetime": "2025-06-01/2025-06-10" });

    let response = post_json(
        app(FakeUpstream::new(&[])),
        "/sentinel2/stac-search",
        json!({ "datetime": "2025-06-01" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let rejecting = FakeUpstream::new(&[(
        "http://stac.test/",
        Reply::Status(429, "application/json", br#"{"code":"TooManyRequests"}"#),
    )]);
    let response = post_json(app(rejecting), "/sentinel2/stac-search", body.clone()).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(body_json(response).await["error"].is_string());

    let response = post_json(app(FakeUpstream::new(&[])), "/sentinel2/stac-search", body).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_stac_search_malformed_body_is_json_400() {
    let upstream = FakeUpstream::new(&[]);
    let response = app(upstream.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sentinel2/stac-search")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"bbox\": [0, 0"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(header_str(&response, "content-type").starts_with("application/json"));
    assert!(body_json(response).await["error"].as_str().unwrap().contains("body"));

    let response = app(upstream.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sentinel2/stac-search")
                .body(Body::from("bbox=1"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_tile_extension_must_match_kind() {
    let upstream = FakeUpstream::new(&[]);

    let response = get(app(upstream.clone()), "/sentinel2/ndvi-tiles/1/0/0.jpg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());

    let response = get(app(upstream.clone()), "/sentinel2/satellite-tiles/1/0/0.jpeg").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let response = get(app(FakeUpstream::new(&[])), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_status_reports_each_upstream() {
    let upstream = FakeUpstream::new(&[
        ("http://wms.test/", Reply::Status(503, "text/plain", b"")),
        ("http://esri.test/tile/1/1/1", Reply::Status(200, "image/jpeg", JPEG)),
    ]);
    let response = get(app(upstream), "/api/sentinel2/status").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["copernicus"], "error-503");
    assert_eq!(body["esri"], "ok");
    assert_eq!(body["credentials_configured"], false);
    assert_eq!(body["api_url"], "http://localhost:3001");

    let body = body_json(get(app(FakeUpstream::new(&[])), "/sentinel2/status").await).await;
    assert_eq!(body["copernicus"], "offline");
    assert_eq!(body["esri"], "offline");
}
