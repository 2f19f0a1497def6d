//! Metric names and descriptions.
//!
//! Recording happens inline with the `metrics` macros; this module only
//! registers help text with whichever recorder is installed.

use metrics::{describe_counter, describe_histogram, Unit};

pub const TILE_REQUESTS: &str = "tile_requests_total";
pub const PROVIDER_ATTEMPTS: &str = "tile_provider_attempts_total";
pub const PLACEHOLDERS: &str = "tile_placeholders_total";
pub const RESOLVE_DURATION: &str = "tile_resolve_duration_seconds";
pub const TOKEN_REQUESTS: &str = "copernicus_token_requests_total";

/// Register descriptions for every metric the proxy emits.
pub fn describe_metrics() {
    describe_counter!(TILE_REQUESTS, "Tile requests by imagery kind and product");
    describe_counter!(
        PROVIDER_ATTEMPTS,
        "Upstream provider attempts by provider and outcome"
    );
    describe_counter!(PLACEHOLDERS, "Tiles answered with a placeholder image");
    describe_histogram!(
        RESOLVE_DURATION,
        Unit::Seconds,
        "Wall time to resolve one tile across the fallback chain"
    );
    describe_counter!(TOKEN_REQUESTS, "OAuth2 token requests sent to Copernicus");
}
