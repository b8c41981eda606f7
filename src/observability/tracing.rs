//! Per-request spans and the OpenTelemetry export pipeline.
//!
//! # Responsibilities
//! - Create the span that scopes one cart operation
//! - Join that span to the caller's W3C trace context
//! - Record request attributes and the final status on it
//! - Build the OTLP tracer provider when span export is enabled
//!
//! # Design Decisions
//! - Field names follow OpenTelemetry conventions (`otel.status_code`,
//!   `error.message`) so the OTel layer exports them unchanged
//! - Fields are declared `Empty` up front; `Span::record` ignores undeclared ones
//! - Every trace is sampled

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use tracing::field::Empty;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::schema::ObservabilityConfig;

/// The OTLP exporter could not be built.
#[derive(Debug, thiserror::Error)]
#[error("failed to build OTLP span exporter: {0}")]
pub struct TracingError(String);

/// An installed span export pipeline.
pub struct TracingPipeline {
    provider: TracerProvider,
    service_name: String,
}

impl TracingPipeline {
    pub fn tracer(&self) -> Tracer {
        self.provider.tracer(self.service_name.clone())
    }

    /// Flush pending spans and stop the exporter.
    pub fn shutdown(self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = %e, "Tracer provider shutdown failed");
        }
    }
}

/// `service.name` / `service.version` attached to every exported span.
pub fn service_resource(config: &ObservabilityConfig) -> Resource {
    Resource::new([
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
    ])
}

/// Build the OTLP pipeline and install the W3C propagator.
///
/// Returns `None` when span export is disabled. Must be called from within a
/// Tokio runtime.
pub fn init_tracer(config: &ObservabilityConfig) -> Result<Option<TracingPipeline>, TracingError> {
    if !config.tracing_enabled {
        return Ok(None);
    }

    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()
        .map_err(|e| TracingError(e.to_string()))?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(service_resource(config))
        .build();
    global::set_tracer_provider(provider.clone());

    Ok(Some(TracingPipeline {
        provider,
        service_name: config.service_name.clone(),
    }))
}

/// Span wrapping one operation on `endpoint`, child of `parent` if it carries a trace.
pub fn request_span(endpoint: &'static str, request_id: Option<&str>, parent: &Context) -> Span {
    let span = tracing::info_span!(
        target: "cart",
        "cart.request",
        endpoint,
        request_id = request_id.unwrap_or("unknown"),
        user_id = Empty,
        item_id = Empty,
        otel.status_code = Empty,
        error.message = Empty,
    );
    span.set_parent(parent.clone());
    span
}

pub fn record_user(span: &Span, user_id: &str) {
    span.record("user_id", user_id);
}

pub fn record_item(span: &Span, item_id: &str) {
    span.record("item_id", item_id);
}

pub fn mark_ok(span: &Span) {
    span.record("otel.status_code", "OK");
}

pub fn mark_error(span: &Span, message: &str) {
    span.record("otel.status_code", "ERROR");
    span.record("error.message", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use opentelemetry::propagation::TextMapPropagator;
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::trace::{TraceContextExt, TraceId};
    use opentelemetry::{Key, Value};
    use tracing_subscriber::layer::SubscriberExt;

    const TRACE_ID: &str = "4bf92f3577b34da6a3ce929d0e0e4736";

    #[test]
    fn test_request_span_joins_incoming_trace() {
        let provider = TracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("cart-test")));

        let carrier = HashMap::from([(
            "traceparent".to_string(),
            format!("00-{TRACE_ID}-00f067aa0ba902b7-01"),
        )]);
        let parent = TraceContextPropagator::new().extract(&carrier);

        tracing::subscriber::with_default(subscriber, || {
            let span = request_span("/cart/view", Some("req-1"), &parent);
            let trace_id = span.context().span().span_context().trace_id();
            assert_eq!(trace_id, TraceId::from_hex(TRACE_ID).unwrap());
        });
    }

    #[test]
    fn test_service_resource() {
        let resource = service_resource(&ObservabilityConfig::default());
        assert_eq!(
            resource.get(Key::new("service.name")),
            Some(Value::from("ecommerce-service"))
        );
        assert_eq!(
            resource.get(Key::new("service.version")),
            Some(Value::from("1.0.0"))
        );
    }

    #[test]
    fn test_init_tracer_disabled() {
        assert!(init_tracer(&ObservabilityConfig::default()).unwrap().is_none());
    }
}
