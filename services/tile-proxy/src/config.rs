//! Proxy configuration, read from the environment.

use anyhow::{Context, Result};
use reqwest::Url;
use std::time::Duration;

use tile_common::time::{DEFAULT_LOOKBACK_DAYS, MAX_LOOKBACK_DAYS};

pub const DEFAULT_TOKEN_URL: &str =
    "https://identity.dataspace.copernicus.eu/auth/realms/CDSE/protocol/openid-connect/token";
pub const DEFAULT_WMS_URL: &str = "https://sh.dataspace.copernicus.eu/api/v1/wms";
pub const DEFAULT_STAC_URL: &str = "https://stac.dataspace.copernicus.eu/api/v1";
pub const DEFAULT_GOOGLE_TILE_URL: &str = "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}";
pub const DEFAULT_BING_TILE_URL: &str =
    "https://ecn.t0.tiles.virtualearth.net/tiles/a{quadkey}.jpeg?g=1";
pub const DEFAULT_ESRI_TILE_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

const DEFAULT_PRIMARY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FALLBACK_TIMEOUT_SECS: u64 = 8;

/// OAuth2 client credentials for the Copernicus identity service.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Upstream endpoint templates.
///
/// Tile templates use `{z}`, `{x}`, `{y}` and `{quadkey}` placeholders.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub token_url: String,
    pub wms_url: Url,
    pub stac_api_url: String,
    pub google_tile_url: String,
    pub bing_tile_url: String,
    pub esri_tile_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            wms_url: Url::parse(DEFAULT_WMS_URL).expect("default WMS URL is valid"),
            stac_api_url: DEFAULT_STAC_URL.to_string(),
            google_tile_url: DEFAULT_GOOGLE_TILE_URL.to_string(),
            bing_tile_url: DEFAULT_BING_TILE_URL.to_string(),
            esri_tile_url: DEFAULT_ESRI_TILE_URL.to_string(),
        }
    }
}

/// Per-attempt time budgets.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Copernicus WMS attempts.
    pub primary: Duration,
    /// Google, Bing and Esri attempts.
    pub fallback: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            primary: Duration::from_secs(DEFAULT_PRIMARY_TIMEOUT_SECS),
            fallback: Duration::from_secs(DEFAULT_FALLBACK_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub credentials: Option<ClientCredentials>,
    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
    /// Days of imagery requested from Copernicus, ending today.
    pub lookback_days: u32,
    /// Public base URL of this service, reported by the status endpoint.
    pub public_api_url: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            endpoints: Endpoints::default(),
            timeouts: Timeouts::default(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            public_api_url: None,
        }
    }
}

impl ProxyConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values count as unset. Credentials fall back to the
    /// `VITE_`-prefixed names the dashboard build uses.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let client_id = get("COPERNICUS_CLIENT_ID").or_else(|| get("VITE_COPERNICUS_CLIENT_ID"));
        let client_secret =
            get("COPERNICUS_CLIENT_SECRET").or_else(|| get("VITE_COPERNICUS_CLIENT_SECRET"));
        let credentials = match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => Some(ClientCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let wms_url = get_or("COPERNICUS_WMS_URL", DEFAULT_WMS_URL);
        let wms_url = Url::parse(&wms_url)
            .with_context(|| format!("Invalid COPERNICUS_WMS_URL: {}", wms_url))?;

        let endpoints = Endpoints {
            token_url: get_or("COPERNICUS_TOKEN_URL", DEFAULT_TOKEN_URL),
            wms_url,
            stac_api_url: get_or("VITE_STAC_API_URL", DEFAULT_STAC_URL)
                .trim_end_matches('/')
                .to_string(),
            google_tile_url: get_or("GOOGLE_TILE_URL", DEFAULT_GOOGLE_TILE_URL),
            bing_tile_url: get_or("BING_TILE_URL", DEFAULT_BING_TILE_URL),
            esri_tile_url: get_or("ESRI_TILE_URL", DEFAULT_ESRI_TILE_URL),
        };

        let parse_secs = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("Invalid {}: {}", key, v)),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let timeouts = Timeouts {
            primary: parse_secs("PRIMARY_TIMEOUT_SECS", DEFAULT_PRIMARY_TIMEOUT_SECS)?,
            fallback: parse_secs("FALLBACK_TIMEOUT_SECS", DEFAULT_FALLBACK_TIMEOUT_SECS)?,
        };

        let lookback_days = match get("SENTINEL_LOOKBACK_DAYS") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|days| *days <= MAX_LOOKBACK_DAYS)
                .with_context(|| {
                    format!(
                        "Invalid SENTINEL_LOOKBACK_DAYS: {} (expected 0..={})",
                        v, MAX_LOOKBACK_DAYS
                    )
                })?,
            None => DEFAULT_LOOKBACK_DAYS,
        };

        Ok(Self {
            credentials,
            endpoints,
            timeouts,
            lookback_days,
            public_api_url: get("VITE_API_URL"),
        })
    }
}
