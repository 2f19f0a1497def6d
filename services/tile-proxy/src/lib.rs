//! Sentinel-2 tile proxy.
//!
//! Resolves XYZ tile requests for true-colour and index imagery against
//! Copernicus, Google, Bing and Esri, in that order of preference, and always
//! answers with an image.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod providers;
pub mod resolver;
pub mod state;
pub mod upstream;

pub use handlers::{build_router, ApiError};
pub use state::AppState;
