//! Application state for the tile proxy.

use anyhow::Result;
use std::sync::Arc;

use crate::auth::{CopernicusAuth, InMemoryTokenCache, TokenCache};
use crate::config::ProxyConfig;
use crate::resolver::TileResolver;
use crate::upstream::{ReqwestUpstream, UpstreamClient};

/// Shared application state.
pub struct AppState {
    pub config: ProxyConfig,

    /// Pooled client for every upstream call.
    pub client: Arc<dyn UpstreamClient>,

    /// Copernicus token provider, shared with the resolver.
    pub auth: Arc<CopernicusAuth>,

    pub resolver: TileResolver,
}

impl AppState {
    /// Create state backed by a real HTTP client and an in-memory token cache.
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let client: Arc<dyn UpstreamClient> = Arc::new(ReqwestUpstream::new()?);
        Ok(Self::with_client(config, client, Arc::new(InMemoryTokenCache::new())))
    }

    /// Create state around an injected upstream client and token cache.
    pub fn with_client(
        config: ProxyConfig,
        client: Arc<dyn UpstreamClient>,
        token_cache: Arc<dyn TokenCache>,
    ) -> Self {
        let auth = Arc::new(CopernicusAuth::new(
            client.clone(),
            config.endpoints.token_url.clone(),
            config.credentials.clone(),
            token_cache,
        ));
        let resolver = TileResolver::new(client.clone(), auth.clone(), config.clone());

        Self {
            config,
            client,
            auth,
            resolver,
        }
    }
}
