//! Error types for the tile proxy.

use thiserror::Error;

/// Result type alias using ProxyError.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Errors that can reach an HTTP caller.
///
/// Upstream provider failures are deliberately absent: they are absorbed by
/// the fallback chain and never surface on tile routes.
#[derive(Debug, Error)]
pub enum ProxyError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid tile coordinate: {0}")]
    InvalidTile(String),

    #[error("Invalid BBOX: {0}")]
    InvalidBbox(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // === Upstream Errors ===
    #[error("Upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream unreachable: {0}")]
    BadGateway(String),

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ProxyError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ProxyError::MissingParameter(_)
            | ProxyError::InvalidParameter { .. }
            | ProxyError::InvalidTile(_)
            | ProxyError::InvalidBbox(_) => 400,

            ProxyError::LayerNotFound(_) | ProxyError::NotFound(_) => 404,

            ProxyError::Upstream { status, .. } => *status,
            ProxyError::BadGateway(_) => 502,

            _ => 500,
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::InternalError(format!("JSON error: {}", err))
    }
}

impl From<crate::bbox::BboxParseError> for ProxyError {
    fn from(err: crate::bbox::BboxParseError) -> Self {
        ProxyError::InvalidBbox(err.to_string())
    }
}
