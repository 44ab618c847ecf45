//! Tally Binary Entry Point
//!
//! This binary runs the complete presence collector.
//! Core functionality is provided by the `tally` library crate.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tally::{
    config::{AppConfig, parse_duration},
    geo::PrefixLookup,
    server::{AppState, create_router},
    storage::StorageBuilder,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tally - Unique-Visitor Presence Collector
#[derive(Parser, Debug)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "TALLY_CONFIG"
    )]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "TALLY_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "TALLY_SERVER_PORT")]
    server_port: Option<u16>,

    /// Database file path (overrides config file)
    #[arg(long, env = "TALLY_DB_PATH")]
    db_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tally=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Tally - Unique-Visitor Presence Collector");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(path) = cli.db_path {
        config.database.path = path;
    }
    config.validate()?;

    tracing::info!(
        "Server: {}:{}, Database: {}",
        config.server.bind,
        config.server.port,
        config.database.path,
    );

    // Build storage layer
    let checkpoint_interval = parse_duration(&config.database.checkpoint_interval)?;
    let handles = StorageBuilder::new(&config.database.path)
        .channel_capacity(config.database.channel_capacity)
        .checkpoint_interval(checkpoint_interval)
        .build()?;

    tracing::info!("Storage initialized");

    // Create web server state
    let app_state = AppState {
        writer: handles.writer.clone(),
        reader: handles.reader.clone(),
        lookup: Arc::new(PrefixLookup::from_config(&config.geo)),
    };

    // Build Axum router
    let app = create_router(app_state);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown; peer addresses feed the country lookup
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(handles))
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal(handles: tally::StorageHandles) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    tracing::info!("Shutting down storage...");
    if let Err(e) = handles.shutdown() {
        tracing::error!("Failed to shutdown storage: {}", e);
    }
}
