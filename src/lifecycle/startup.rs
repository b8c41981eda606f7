//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize telemetry (logging, metrics exporter)
//! - Build the repository, operation handlers and gauge collector
//! - Start background tasks and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any telemetry or bind error is fatal
//! - The collector stops with the server, whichever way the server exits

use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::BuildError;
use tokio::net::TcpListener;
use tracing_subscriber::util::TryInitError;

use crate::cart::CartRepository;
use crate::config::{ConfigError, ObservabilityConfig, ServiceConfig};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::gauge::{GaugeCollector, GaugeObservation};
use crate::observability::logging::init_logging;
use crate::observability::metrics::{init_metrics, CART_ITEMS};
use crate::observability::tracing::{init_tracer, TracingError, TracingPipeline};
use crate::observability::sink::TelemetrySink;
use crate::operations::CartOperations;

/// Fatal error before or while serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] TryInitError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error(transparent)]
    Tracing(#[from] TracingError),

    #[error("invalid address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the service runs on, wired to one telemetry sink.
pub struct Services {
    pub repository: Arc<CartRepository>,
    pub operations: Arc<CartOperations>,
    pub collector: GaugeCollector,
}

impl Services {
    pub fn build(telemetry: Arc<dyn TelemetrySink>) -> Self {
        let repository = Arc::new(CartRepository::new());
        let operations = Arc::new(CartOperations::new(repository.clone(), telemetry.clone()));

        let mut collector = GaugeCollector::new(telemetry);
        let source = repository.clone();
        collector.register(CART_ITEMS, move || cart_items_observations(&source));

        Self {
            repository,
            operations,
            collector,
        }
    }
}

/// One `cart_items` observation per owner with a non-empty cart.
pub fn cart_items_observations(repository: &CartRepository) -> Vec<GaugeObservation> {
    repository
        .snapshot_item_counts()
        .into_iter()
        .map(|(user_id, count)| GaugeObservation {
            value: count as f64,
            attributes: vec![("user_id", user_id)],
        })
        .collect()
}

fn parse_addr(address: &str) -> Result<SocketAddr, StartupError> {
    address.parse().map_err(|source| StartupError::Address {
        address: address.to_string(),
        source,
    })
}

/// Install the logging subscriber and, if enabled, the span exporter and the
/// Prometheus exporter.
///
/// The returned pipeline must be shut down on exit to flush buffered spans.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<Option<TracingPipeline>, StartupError> {
    let pipeline = init_tracer(config)?;
    init_logging(config, pipeline.as_ref().map(TracingPipeline::tracer))?;

    if config.metrics_enabled {
        init_metrics(parse_addr(&config.metrics_address)?)?;
    }

    tracing::info!(
        service.name = %config.service_name,
        service.version = %config.service_version,
        span_export = pipeline.is_some(),
        otlp_endpoint = config.tracing_enabled.then_some(config.otlp_endpoint.as_str()),
        "Telemetry initialized"
    );
    Ok(pipeline)
}

/// Run the gauge collector and the HTTP server until `shutdown` fires.
pub async fn serve(
    config: ServiceConfig,
    listener: TcpListener,
    services: Services,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    let interval = Duration::from_secs(config.observability.gauge_interval_secs);
    let collector = tokio::spawn(services.collector.run(interval, shutdown.subscribe()));

    let server = HttpServer::new(config, services.operations);
    let result = server.run(listener, shutdown.subscribe()).await;

    shutdown.trigger();
    if let Err(e) = collector.await {
        tracing::error!(error = %e, "Gauge collector task failed");
    }

    result.map_err(StartupError::Io)
}
