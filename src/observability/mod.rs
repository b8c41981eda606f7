//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Operation handlers produce:
//!     → sink.rs (TelemetrySink: counters, histograms, gauges, logs)
//!     → tracing.rs (one span per request, status + attributes)
//!
//! Gauge collector (gauge.rs), every interval:
//!     → registered callbacks → sink.record_gauge
//!
//! Backends:
//!     → metrics.rs (Prometheus recorder + scrape endpoint)
//!     → logging.rs (JSON / pretty subscriber)
//! ```
//!
//! # Design Decisions
//! - The cart core only sees `Arc<dyn TelemetrySink>`
//! - Emission failures are logged and dropped, never returned to callers
//! - Request ID flows into the request span

pub mod gauge;
pub mod logging;
pub mod metrics;
pub mod sink;
pub mod tracing;

pub use self::gauge::{GaugeCollector, GaugeObservation};
pub use self::metrics::MetricsSink;
pub use self::sink::{InMemorySink, TelemetryError, TelemetrySink};
