//! Cart Service (v1)
//!
//! An in-memory shopping cart service built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                      CART SERVICE                         │
//!                    │                                                           │
//!   Client Request   │  ┌─────────┐    ┌────────────┐    ┌──────────────────┐    │
//!   ─────────────────┼─▶│  http   │───▶│ operations │───▶│ cart::repository │    │
//!                    │  │ server  │    │ add/remove │    │ per-owner locks  │    │
//!                    │  └─────────┘    │   /view    │    └────────┬─────────┘    │
//!                    │                 └─────┬──────┘             │              │
//!                    │                       │ RequestScope       │ snapshot     │
//!                    │                       ▼                    ▼              │
//!                    │  ┌────────────────────────────────────────────────────┐   │
//!                    │  │                 observability                      │   │
//!                    │  │  sink (counters, histograms, logs)  gauge collector │   │
//!                    │  │  spans (cart.request) → OTLP   Prometheus :9090     │   │
//!                    │  └────────────────────────────────────────────────────┘   │
//!                    │                                                           │
//!                    │  ┌─────────┐  ┌───────────────────────────────────────┐   │
//!                    │  │ config  │  │ lifecycle: startup / signals / shutdown│   │
//!                    │  └─────────┘  └───────────────────────────────────────┘   │
//!                    └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use cart_service::config::{load_config, validate_config, ConfigError, ServiceConfig};
use cart_service::lifecycle::signals::shutdown_signal;
use cart_service::lifecycle::startup::{init_telemetry, serve};
use cart_service::lifecycle::{Services, Shutdown, StartupError};
use cart_service::observability::MetricsSink;

#[derive(Parser)]
#[command(name = "cart-service")]
#[command(about = "In-memory shopping cart service with request telemetry", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<ServiceConfig, StartupError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let tracing_pipeline = init_telemetry(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        gauge_interval_secs = config.observability.gauge_interval_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let services = Services::build(Arc::new(MetricsSink));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    let result = serve(config, listener, services, &shutdown).await;

    if let Some(pipeline) = tracing_pipeline {
        pipeline.shutdown();
    }
    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}
