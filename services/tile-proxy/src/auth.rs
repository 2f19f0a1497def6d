//! OAuth2 client-credentials tokens for Copernicus Sentinel Hub.
//!
//! Tokens are cached until shortly before they expire. Refreshes are
//! single-flight: concurrent callers queue on one async mutex and re-check
//! the cache once they hold it, so a validity window costs one token request.
//!
//! Failing to obtain a token is never an error for callers. They get `None`
//! and go upstream unauthenticated.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientCredentials;
use crate::upstream::{FetchError, UpstreamClient};

/// Renew this long before the identity provider's stated expiry.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Assumed lifetime when the token response omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Upper bound on an advertised lifetime (one year).
const MAX_EXPIRES_IN_SECS: u64 = 365 * 24 * 3600;

#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Build from a grant, applying the early-renewal margin.
    pub fn from_grant(access_token: String, expires_in_secs: u64, now: DateTime<Utc>) -> Self {
        let lifetime = Duration::seconds(expires_in_secs.min(MAX_EXPIRES_IN_SECS) as i64);
        Self {
            access_token,
            expires_at: now + lifetime - Duration::seconds(EXPIRY_MARGIN_SECS),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Storage for the current token.
pub trait TokenCache: Send + Sync {
    fn get(&self) -> Option<CachedToken>;
    fn set(&self, token: CachedToken);
}

/// Process-lifetime token slot.
#[derive(Default)]
pub struct InMemoryTokenCache {
    slot: RwLock<Option<CachedToken>>,
}

impl InMemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenCache for InMemoryTokenCache {
    fn get(&self) -> Option<CachedToken> {
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, token: CachedToken) {
        match self.slot.write() {
            Ok(mut guard) => *guard = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token endpoint returned HTTP {0}")]
    Rejected(u16),

    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error("malformed token response: {0}")]
    InvalidResponse(String),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Token provider for the Copernicus identity service.
pub struct CopernicusAuth {
    client: Arc<dyn UpstreamClient>,
    token_url: String,
    credentials: Option<ClientCredentials>,
    cache: Arc<dyn TokenCache>,
    refresh: Mutex<()>,
}

impl CopernicusAuth {
    pub fn new(
        client: Arc<dyn UpstreamClient>,
        token_url: String,
        credentials: Option<ClientCredentials>,
        cache: Arc<dyn TokenCache>,
    ) -> Self {
        Self {
            client,
            token_url,
            credentials,
            cache,
            refresh: Mutex::new(()),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// A valid bearer token, or `None` to proceed unauthenticated.
    pub async fn get_auth_token(&self) -> Option<String> {
        if let Some(token) = self.cached() {
            return Some(token);
        }

        let Some(credentials) = &self.credentials else {
            debug!("Copernicus credentials not configured, requesting unauthenticated");
            return None;
        };

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached() {
            return Some(token);
        }

        match self.request_token(credentials).await {
            Ok(token) => {
                let access_token = token.access_token.clone();
                info!(expires_at = %token.expires_at, "Obtained Copernicus OAuth2 token");
                self.cache.set(token);
                Some(access_token)
            }
            Err(e) => {
                warn!(error = %e, "Failed to obtain Copernicus OAuth2 token");
                None
            }
        }
    }

    fn cached(&self) -> Option<String> {
        self.cache
            .get()
            .filter(|token| token.is_valid_at(Utc::now()))
            .map(|token| token.access_token)
    }

    async fn request_token(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<CachedToken, AuthError> {
        counter!(crate::metrics::TOKEN_REQUESTS).increment(1);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];
        let response = self.client.post_form(&self.token_url, &form).await?;

        if !response.is_success() {
            return Err(AuthError::Rejected(response.status));
        }

        let grant: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        if grant.access_token.is_empty() {
            return Err(AuthError::InvalidResponse("empty access_token".to_string()));
        }

        Ok(CachedToken::from_grant(
            grant.access_token,
            grant.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            Utc::now(),
        ))
    }
}
