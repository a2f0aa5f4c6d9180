//! Service gateway
//!
//! Single entry point in front of a set of backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!         │
//!         ▼
//!   ┌──────────────┐   outside namespace   ┌────────────────────────┐
//!   │ http server  │──────────────────────▶│ /health, JSON 404      │
//!   │ + middleware │                       └────────────────────────┘
//!   └──────┬───────┘
//!          │ inside namespace
//!          ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//!   │   routing    │──▶│load_balancer │──▶│  resilience  │──▶│ transport │──▶ Instance
//!   │longest prefix│   │ round robin  │   │circuit breaker│   │ + deadline│
//!   └──────────────┘   └──────────────┘   └──────────────┘   └───────────┘
//!
//!   Cross-cutting: config (+ hot reload), observability, health monitor,
//!                  admin API, lifecycle (startup/shutdown)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use service_gateway::config::{config_from_env, load_config, ConfigWatcher};
use service_gateway::lifecycle::signals::shutdown_signal;
use service_gateway::observability::{logging, metrics};
use service_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "service-gateway", version, about = "Namespace-scoped API gateway")]
struct Args {
    /// TOML configuration file. Without it, configuration comes from the environment.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };

    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        namespace = %config.scope.namespace,
        services = config.services.len(),
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Hot reload only applies to file-based configuration.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_handle = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();

    server_handle.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
