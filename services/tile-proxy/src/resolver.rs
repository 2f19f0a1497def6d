//! Tile resolution: walk a provider chain, fall back to a placeholder.
//!
//! One generic pipeline serves every imagery kind. Each provider gets exactly
//! one attempt bounded by its own timeout; a timed-out attempt is abandoned by
//! dropping its future, which cancels the in-flight request. Upstream failures
//! are recorded per attempt and logged, never returned: resolution is total.

use bytes::Bytes;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use renderer::{format, placeholder};
use tile_common::tile::bbox_center_tile;
use tile_common::{DateRange, ImageryKind, Product, TileCoord};

use crate::auth::CopernicusAuth;
use crate::config::ProxyConfig;
use crate::providers::{
    copernicus_passthrough_url, fallback_chain, fill_template, static_placeholder,
    PlaceholderKind, Provider, ProviderDescriptor, TileRequest, WmsPassthrough,
};
use crate::upstream::{UpstreamClient, UpstreamResponse};

/// Cache policy for placeholder tiles. They never change.
pub const PLACEHOLDER_CACHE_CONTROL: &str = "public, max-age=86400";

/// Zoom used when the WMS passthrough falls back to an XYZ basemap tile.
pub const WMS_FALLBACK_ZOOM: u32 = 15;

/// How a single provider attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx with an image body of this many bytes.
    Success(usize),
    /// Non-2xx status.
    HttpError(u16),
    /// 2xx with nothing in it.
    EmptyBody,
    /// 2xx whose body is not an image (WMS service exceptions come back as XML).
    NotAnImage,
    /// Connection, TLS or read failure.
    NetworkError(String),
    /// No answer within the attempt's budget.
    Timeout,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success(_))
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success(_) => "success",
            AttemptOutcome::HttpError(_) => "http_error",
            AttemptOutcome::EmptyBody => "empty_body",
            AttemptOutcome::NotAnImage => "not_an_image",
            AttemptOutcome::NetworkError(_) => "network_error",
            AttemptOutcome::Timeout => "timeout",
        }
    }
}

/// Diagnostic record of one provider attempt.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: Provider,
    pub url: String,
    pub timeout: Duration,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

/// Where the served bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSource {
    Upstream(Provider),
    Placeholder,
}

impl TileSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileSource::Upstream(provider) => provider.as_str(),
            TileSource::Placeholder => "placeholder",
        }
    }
}

/// The image served for one request plus its response metadata.
#[derive(Debug, Clone)]
pub struct ResolvedTile {
    pub bytes: Bytes,
    pub content_type: String,
    pub cache_control: &'static str,
    pub source: TileSource,
    pub date_range: Option<DateRange>,
    pub attempts: Vec<ProviderAttempt>,
}

impl ResolvedTile {
    pub fn is_placeholder(&self) -> bool {
        self.source == TileSource::Placeholder
    }

    /// Served by an upstream other than the primary.
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, TileSource::Upstream(p) if !p.is_primary())
    }
}

/// A URL ready to be tried.
struct PlannedAttempt {
    provider: Provider,
    url: String,
    timeout: Duration,
}

struct FetchedImage {
    provider: Provider,
    bytes: Bytes,
    content_type: Option<String>,
}

pub struct TileResolver {
    client: Arc<dyn UpstreamClient>,
    auth: Arc<CopernicusAuth>,
    config: ProxyConfig,
}

impl TileResolver {
    pub fn new(client: Arc<dyn UpstreamClient>, auth: Arc<CopernicusAuth>, config: ProxyConfig) -> Self {
        Self {
            client,
            auth,
            config,
        }
    }

    /// Resolve one tile. Always returns displayable bytes.
    #[instrument(skip_all, fields(kind = %kind, product = product.as_str(), tile = %coord))]
    pub async fn resolve_tile(
        &self,
        kind: ImageryKind,
        product: Product,
        coord: TileCoord,
    ) -> ResolvedTile {
        let started = Instant::now();
        counter!(crate::metrics::TILE_REQUESTS, "kind" => kind.as_str(), "product" => product.as_str())
            .increment(1);

        let date_range = DateRange::recent(self.config.lookback_days);
        let request = TileRequest::new(kind, coord, date_range);
        let chain = fallback_chain(kind, product, &self.config.timeouts);

        let planned = chain
            .providers
            .iter()
            .map(|descriptor: &ProviderDescriptor| PlannedAttempt {
                provider: descriptor.provider,
                url: descriptor.build_url(&self.config.endpoints, &request),
                timeout: descriptor.timeout,
            })
            .collect();

        let (fetched, attempts) = self.run_chain(planned).await;

        let tile = match fetched {
            Some(image) => {
                let content_type = pick_content_type(&image, kind.mime_type());
                info!(
                    source = image.provider.as_str(),
                    size = image.bytes.len(),
                    attempts = attempts.len(),
                    "Tile resolved"
                );
                ResolvedTile {
                    bytes: image.bytes,
                    content_type,
                    cache_control: image.provider.cache_control(),
                    source: TileSource::Upstream(image.provider),
                    date_range: Some(date_range),
                    attempts,
                }
            }
            None => {
                warn!(attempts = attempts.len(), "All providers failed, serving placeholder");
                counter!(crate::metrics::PLACEHOLDERS, "kind" => kind.as_str()).increment(1);
                let (bytes, content_type) = placeholder_bytes(kind, &coord, chain.placeholder);
                ResolvedTile {
                    bytes,
                    content_type: content_type.to_string(),
                    cache_control: PLACEHOLDER_CACHE_CONTROL,
                    source: TileSource::Placeholder,
                    date_range: Some(date_range),
                    attempts,
                }
            }
        };

        histogram!(crate::metrics::RESOLVE_DURATION, "kind" => kind.as_str())
            .record(started.elapsed().as_secs_f64());
        tile
    }

    /// Proxy an arbitrary WMS `GetMap`, falling back to the Esri tile under
    /// the bbox centre. `None` when both fail.
    #[instrument(skip(self, params), fields(layers = %params.layers))]
    pub async fn resolve_wms(&self, params: &WmsPassthrough) -> Option<ResolvedTile> {
        let endpoints = &self.config.endpoints;
        let center_tile = bbox_center_tile(&params.bbox, WMS_FALLBACK_ZOOM);

        let planned = vec![
            PlannedAttempt {
                provider: Provider::Copernicus,
                url: copernicus_passthrough_url(&endpoints.wms_url, params),
                timeout: self.config.timeouts.primary,
            },
            PlannedAttempt {
                provider: Provider::Esri,
                url: fill_template(&endpoints.esri_tile_url, &center_tile),
                timeout: self.config.timeouts.fallback,
            },
        ];

        let (fetched, attempts) = self.run_chain(planned).await;
        let image = fetched?;
        let content_type = pick_content_type(&image, "image/png");

        Some(ResolvedTile {
            bytes: image.bytes,
            content_type,
            cache_control: image.provider.cache_control(),
            source: TileSource::Upstream(image.provider),
            date_range: None,
            attempts,
        })
    }

    /// Try each planned attempt in order until one yields an image.
    async fn run_chain(
        &self,
        planned: Vec<PlannedAttempt>,
    ) -> (Option<FetchedImage>, Vec<ProviderAttempt>) {
        let mut attempts = Vec::with_capacity(planned.len());

        for plan in planned {
            let started = Instant::now();
            let result = tokio::time::timeout(plan.timeout, self.fetch(plan.provider, &plan.url)).await;
            let elapsed = started.elapsed();

            let (outcome, image) = match result {
                Err(_) => (AttemptOutcome::Timeout, None),
                Ok(Err(message)) => (AttemptOutcome::NetworkError(message), None),
                Ok(Ok(response)) => {
                    if !response.is_success() {
                        (AttemptOutcome::HttpError(response.status), None)
                    } else if response.body.is_empty() {
                        (AttemptOutcome::EmptyBody, None)
                    } else if !format::is_image(&response.body) {
                        (AttemptOutcome::NotAnImage, None)
                    } else {
                        (
                            AttemptOutcome::Success(response.body.len()),
                            Some(FetchedImage {
                                provider: plan.provider,
                                bytes: response.body,
                                content_type: response.content_type,
                            }),
                        )
                    }
                }
            };

            counter!(
                crate::metrics::PROVIDER_ATTEMPTS,
                "provider" => plan.provider.as_str(),
                "outcome" => outcome.label()
            )
            .increment(1);

            if outcome.is_success() {
                debug!(provider = plan.provider.as_str(), elapsed_ms = elapsed.as_millis() as u64, "Provider answered");
            } else {
                warn!(
                    provider = plan.provider.as_str(),
                    url = %plan.url,
                    outcome = ?outcome,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Provider attempt failed"
                );
            }

            attempts.push(ProviderAttempt {
                provider: plan.provider,
                url: plan.url,
                timeout: plan.timeout,
                elapsed,
                outcome,
            });

            if image.is_some() {
                return (image, attempts);
            }
        }

        (None, attempts)
    }

    /// One upstream GET. Copernicus requests carry a bearer token when one
    /// can be had; token acquisition counts against the attempt's budget.
    async fn fetch(
        &self,
        provider: Provider,
        url: &str,
    ) -> Result<UpstreamResponse, String> {
        let bearer = if provider.is_primary() {
            self.auth.get_auth_token().await
        } else {
            None
        };

        self.client
            .get(url, bearer.as_deref())
            .await
            .map_err(|e| e.to_string())
    }
}

/// Sniffed type first, then the upstream header, then the route default.
fn pick_content_type(image: &FetchedImage, default: &str) -> String {
    if let Some(sniffed) = format::sniff_content_type(&image.bytes) {
        return sniffed.to_string();
    }
    image
        .content_type
        .as_deref()
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or(default)
        .to_string()
}

fn placeholder_bytes(
    kind: ImageryKind,
    coord: &TileCoord,
    strategy: PlaceholderKind,
) -> (Bytes, &'static str) {
    if strategy == PlaceholderKind::Procedural {
        match placeholder::procedural_index_tile(kind, coord) {
            Ok(png) => return (Bytes::from(png), "image/png"),
            Err(e) => error!(error = %e, "Procedural placeholder failed, using static asset"),
        }
    }
    let asset = static_placeholder(kind);
    (Bytes::from_static(asset.bytes), asset.content_type)
}
