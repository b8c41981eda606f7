//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber
//! - Turn [`LogRecord`]s into structured events
//!
//! # Design Decisions
//! - JSON (flattened, with the current span) for production, pretty for development
//! - The OpenTelemetry layer sits behind the same filter as the log output
//! - `RUST_LOG` overrides the configured level

use opentelemetry_sdk::trace::Tracer;
use tracing::Level;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};
use crate::observability::sink::{LogLevel, LogRecord};

/// Install the global subscriber. Fails if one is already installed.
///
/// With a `tracer`, request spans are also exported through OpenTelemetry.
pub fn init_logging(config: &ObservabilityConfig, tracer: Option<Tracer>) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("cart_service={level},cart={level},tower_http={level}", level = config.log_level).into()
    });

    let json_layer = (config.log_format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
    });
    let text_layer = (config.log_format == LogFormat::Pretty).then(tracing_subscriber::fmt::layer);
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(json_layer)
        .with(text_layer)
        .try_init()
}

/// Emit `record` as a `tracing` event in the current span.
pub fn write_record(record: &LogRecord) {
    let f = &record.fields;
    let cart_total = f.cart_total.map(|t| t.to_string());

    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                target: "cart",
                $level,
                operation = f.operation,
                endpoint = f.endpoint,
                user_id = f.user_id.as_deref(),
                item_id = f.item_id.as_deref(),
                quantity = f.quantity,
                item_count = f.item_count,
                cart_total = cart_total.as_deref(),
                error = f.error.as_deref(),
                "{}",
                record.message
            )
        };
    }

    match record.level {
        LogLevel::Debug => emit!(Level::DEBUG),
        LogLevel::Info => emit!(Level::INFO),
        LogLevel::Warn => emit!(Level::WARN),
        LogLevel::Error => emit!(Level::ERROR),
    }
}
