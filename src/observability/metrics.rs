//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder and its scrape endpoint
//! - Describe the service instruments
//! - Bridge [`TelemetrySink`] onto the `metrics` facade
//!
//! # Metrics
//! - `request_count` (counter): requests by endpoint
//! - `request_latency` (histogram, ms): latency by endpoint
//! - `cart_items` (gauge): items in cart by user, sampled periodically
//!
//! # Design Decisions
//! - Facade calls are cheap and infallible; the sink never returns an error
//! - Histogram buckets tuned for in-memory request latencies

use std::net::SocketAddr;

use metrics::{Label, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

use crate::observability::logging;
use crate::observability::sink::{Attribute, LogRecord, TelemetryError, TelemetrySink};

pub const REQUEST_COUNT: &str = "request_count";
pub const REQUEST_LATENCY: &str = "request_latency";
pub const CART_ITEMS: &str = "cart_items";

const LATENCY_BUCKETS_MS: [f64; 12] = [
    0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0,
];

/// Install the global Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(REQUEST_LATENCY.to_string()), &LATENCY_BUCKETS_MS)?
        .install()?;

    describe_metrics();
    tracing::info!(address = %addr, "Prometheus metrics exporter started");
    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!(REQUEST_COUNT, "Number of requests processed");
    metrics::describe_histogram!(REQUEST_LATENCY, Unit::Milliseconds, "Latency of requests");
    metrics::describe_gauge!(CART_ITEMS, "Number of items in cart");
}

fn labels(attributes: &[Attribute]) -> Vec<Label> {
    attributes
        .iter()
        .map(|(key, value)| Label::new(*key, value.clone()))
        .collect()
}

/// Production sink: metrics go to the installed recorder, logs to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSink;

impl TelemetrySink for MetricsSink {
    fn increment_counter(&self, name: &'static str, attributes: &[Attribute]) -> Result<(), TelemetryError> {
        metrics::counter!(name, labels(attributes)).increment(1);
        Ok(())
    }

    fn record_histogram(
        &self,
        name: &'static str,
        value: f64,
        attributes: &[Attribute],
    ) -> Result<(), TelemetryError> {
        metrics::histogram!(name, labels(attributes)).record(value);
        Ok(())
    }

    fn record_gauge(
        &self,
        name: &'static str,
        value: f64,
        attributes: &[Attribute],
    ) -> Result<(), TelemetryError> {
        metrics::gauge!(name, labels(attributes)).set(value);
        Ok(())
    }

    fn emit_log(&self, record: &LogRecord) -> Result<(), TelemetryError> {
        logging::write_record(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let attrs = [("endpoint", "/cart/view".to_string())];
        let labels = labels(&attrs);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].key(), "endpoint");
        assert_eq!(labels[0].value(), "/cart/view");
    }

    #[test]
    fn test_sink_without_recorder_is_noop() {
        let sink = MetricsSink;
        assert!(sink.increment_counter(REQUEST_COUNT, &[]).is_ok());
        assert!(sink.record_histogram(REQUEST_LATENCY, 2.0, &[]).is_ok());
        assert!(sink.record_gauge(CART_ITEMS, 3.0, &[("user_id", "u".into())]).is_ok());
    }
}
