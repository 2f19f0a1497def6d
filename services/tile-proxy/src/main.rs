//! Sentinel-2 tile proxy service.
//!
//! Serves XYZ tiles for true-colour and spectral-index imagery, falling back
//! across imagery providers and finally to a placeholder.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tile_proxy::config::ProxyConfig;
use tile_proxy::metrics::describe_metrics;
use tile_proxy::{build_router, AppState};

/// Sentinel-2 tile proxy
#[derive(Parser, Debug)]
#[command(name = "tile-proxy")]
#[command(about = "Sentinel-2 tile proxy with multi-provider fallback")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3001", env = "PROXY_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "PROXY_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;
    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    describe_metrics();

    let config = ProxyConfig::from_env()?;
    info!(
        credentials = config.credentials.is_some(),
        wms_url = %config.endpoints.wms_url,
        lookback_days = config.lookback_days,
        "Starting Sentinel-2 tile proxy"
    );

    let state = Arc::new(AppState::new(config)?);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .layer(Extension(prometheus_handle));
    let app = build_router(state).merge(metrics_routes);

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /metrics - Prometheus exposition
async fn metrics_handler(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}
