//! HTTP client abstraction for upstream imagery and identity services.
//!
//! Everything the proxy sends upstream goes through [`UpstreamClient`], so
//! tests can swap in a scripted client and count calls per provider.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// User-Agent sent upstream. Google rejects requests without one.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Hard ceiling on any single upstream call. Per-attempt budgets are
/// shorter and enforced by the resolver.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// A fully-read upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// GET, optionally with a bearer token.
    async fn get(&self, url: &str, bearer: Option<&str>) -> Result<UpstreamResponse, FetchError>;

    /// POST an `application/x-www-form-urlencoded` body.
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<UpstreamResponse, FetchError>;

    /// POST a JSON body.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<UpstreamResponse, FetchError>;
}

/// Real client backed by a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn read(url: &str, response: reqwest::Response) -> Result<UpstreamResponse, FetchError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| transport(url, e))?;

        debug!(url = %url, status, size = body.len(), "Upstream response");
        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

fn transport(url: &str, err: reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstream {
    async fn get(&self, url: &str, bearer: Option<&str>) -> Result<UpstreamResponse, FetchError> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| transport(url, e))?;
        Self::read(url, response).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<UpstreamResponse, FetchError> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| transport(url, e))?;
        Self::read(url, response).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<UpstreamResponse, FetchError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| transport(url, e))?;
        Self::read(url, response).await
    }
}
