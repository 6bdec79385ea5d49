//! Authorization gate (v1)
//!
//! A front door for a configuration and naming service built with Tokio and
//! Axum. Every request passes a five-stage decision pipeline before it is
//! forwarded to the protected upstream.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ origin guard ──▶ gate middleware
//!                                                          │
//!                         ┌────────────────────────────────┤
//!                         ▼                                ▼
//!                 auth::AuthorizationGate          deny: status + message
//!                   1. auth disabled
//!                   2. static resource   ◀── security::path
//!                   3. server signature  ◀── security::signature
//!                   4. server identity
//!                   5. permission        ◀── routing + resource parsers
//!                         │                   + AuthManager
//!                         ▼
//!                 http::proxy ──────────────────────────────▶ Upstream
//!
//!     Cross-cutting: config (+ hot reload), observability, lifecycle
//! ```

use std::path::PathBuf;

use auth_gate::config::{load_config, watcher::ConfigWatcher, GateConfig};
use auth_gate::http::GateServer;
use auth_gate::lifecycle::{shutdown_signal, Shutdown};
use auth_gate::observability::{logging, metrics};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "auth-gate")]
#[command(about = "Request-level authorization gate", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the `[auth]` section when the configuration file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!("auth-gate v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        auth_enabled = config.auth.enabled,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    let server = GateServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
