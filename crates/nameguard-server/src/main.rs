//! NameGuard Server
//!
//! HTTP service that screens payment comments for person names and
//! checks detected names against a sanctions table.
//!
//! The detection cascade runs three tiers (quick filter, NER, generative
//! verifier); every tier degrades gracefully so the service always answers.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

mod config;
mod routes;
mod state;

use config::ServerConfig;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "nameguard-server")]
#[command(about = "NameGuard payment comment screening service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Sanctions table path (TSV)
    #[arg(short, long)]
    sanctions: Option<PathBuf>,

    /// Request audit log path (CSV)
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Disable the generative verifier tier
    #[arg(long)]
    no_verifier: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting NameGuard Server");

    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");
    info!("Sanctions table: {}", config.detector.sanctions_path.display());
    info!(
        "Tagger: {} ({})",
        config.detector.tagger.model_repo,
        if config.detector.tagger.enabled { "enabled" } else { "disabled" }
    );
    info!(
        "Verifier: {} ({})",
        config.detector.verifier.model_name,
        if config.detector.verifier.enabled { "enabled" } else { "disabled" }
    );

    let metrics_handle = init_metrics()?;

    info!("Initializing application state...");
    let state = AppState::new(config.clone(), metrics_handle).await?;
    info!("Application state initialized successfully");

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("NameGuard listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("nameguard=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nameguard=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "nameguard_requests_total",
        "Total number of comments screened"
    );
    metrics::describe_counter!(
        "nameguard_cache_hits_total",
        "Total number of cache hits"
    );
    metrics::describe_counter!(
        "nameguard_tier_decisions_total",
        "Total number of final decisions by tier"
    );
    metrics::describe_counter!(
        "nameguard_errors_total",
        "Total number of errors by stage"
    );
    metrics::describe_counter!(
        "nameguard_sanctions_hits_total",
        "Total number of detected names matched against the sanctions table"
    );
    metrics::describe_histogram!(
        "nameguard_pipeline_latency_us",
        metrics::Unit::Microseconds,
        "Detection pipeline latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
