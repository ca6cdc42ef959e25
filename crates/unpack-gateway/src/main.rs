//! Unpack Gateway
//!
//! Entry point for the image sync relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unpack_gateway::capabilities::Capabilities;
use unpack_gateway::config::{Config, LogFormat};
use unpack_gateway::observability::metrics::init_metrics_recorder;
use unpack_gateway::routes::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment variables already set take precedence over .env
    let dotenv = dotenvy::dotenv();

    let config = Config::from_env();

    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or(LogFormat::Text),
    );

    info!("Starting Unpack Gateway");

    if let Ok(path) = &dotenv {
        info!(path = %path.display(), "Loaded environment from .env");
    }

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let capabilities = Capabilities::from_config(&config);
    info!(
        bind_address = %config.bind_address,
        gitlab = capabilities.gitlab,
        github = capabilities.github,
        shared_secret = capabilities.shared_secret,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );
    if capabilities.enabled_routes().is_empty() {
        warn!("No provider is configured; no sync routes will be registered");
    }

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let bind_address = config.bind_address.clone();
    let drain_seconds = config.drain_seconds;

    // Fetch signing keys for every enabled provider
    let state = AppState::bootstrap(config).await.map_err(|e| {
        error!("Startup failed: {}", e);
        e
    })?;

    let app = routes::build_routes(Arc::new(state), metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Unpack Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_seconds))
    .await?;

    info!("Unpack Gateway shutdown complete");

    Ok(())
}

fn init_tracing(log_format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "unpack_gateway=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    }
}
