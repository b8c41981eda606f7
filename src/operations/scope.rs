//! Request-scoped telemetry guard.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::Context;
use tracing::Span;

use crate::error::CartError;
use crate::observability::metrics::{REQUEST_COUNT, REQUEST_LATENCY};
use crate::observability::sink::{report, LogFields, LogLevel, LogRecord, TelemetrySink};
use crate::observability::tracing as spans;

/// The three cart operations and their fixed labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
    View,
}

impl Operation {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Operation::Add => "/cart/add",
            Operation::Remove => "/cart/remove",
            Operation::View => "/cart/view",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add => "add_to_cart",
            Operation::Remove => "remove_from_cart",
            Operation::View => "view_cart",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Operation::Add => "Error processing add to cart request",
            Operation::Remove => "Error processing remove from cart request",
            Operation::View => "Error processing view cart request",
        }
    }
}

/// Times one operation and emits its request metrics when dropped.
///
/// `Drop` runs on every exit path (error returns, panics and cancelled
/// futures included), so each request yields exactly one `request_count`
/// increment and one `request_latency` observation.
pub struct RequestScope {
    telemetry: Arc<dyn TelemetrySink>,
    operation: Operation,
    span: Span,
    start: Instant,
    user_id: Option<String>,
    item_id: Option<String>,
}

impl RequestScope {
    pub fn begin(
        telemetry: Arc<dyn TelemetrySink>,
        operation: Operation,
        request_id: Option<&str>,
        parent: &Context,
    ) -> Self {
        Self {
            telemetry,
            operation,
            span: spans::request_span(operation.endpoint(), request_id, parent),
            start: Instant::now(),
            user_id: None,
            item_id: None,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn annotate_user(&mut self, user_id: &str) {
        spans::record_user(&self.span, user_id);
        self.user_id = Some(user_id.to_string());
    }

    pub fn annotate_item(&mut self, item_id: &str) {
        spans::record_item(&self.span, item_id);
        self.item_id = Some(item_id.to_string());
    }

    /// Mark the span OK and emit an info log summarising the effect.
    pub fn succeed(&self, message: &'static str, summary: LogFields) {
        spans::mark_ok(&self.span);
        self.log(LogLevel::Info, message, summary);
    }

    /// Mark the span errored and emit an error log.
    pub fn fail(&self, error: &CartError) {
        let message = error.to_string();
        spans::mark_error(&self.span, &message);
        self.log(
            LogLevel::Error,
            self.operation.failure_message(),
            LogFields {
                error: Some(message),
                ..LogFields::default()
            },
        );
    }

    fn log(&self, level: LogLevel, message: &'static str, fields: LogFields) {
        let record = LogRecord {
            level,
            message,
            fields: LogFields {
                operation: self.operation.name(),
                endpoint: self.operation.endpoint(),
                user_id: self.user_id.clone(),
                item_id: self.item_id.clone(),
                ..fields
            },
        };
        self.span
            .in_scope(|| report(self.telemetry.emit_log(&record), "log"));
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        let attributes = [("endpoint", self.operation.endpoint().to_string())];

        report(
            self.telemetry.increment_counter(REQUEST_COUNT, &attributes),
            REQUEST_COUNT,
        );
        report(
            self.telemetry.record_histogram(REQUEST_LATENCY, elapsed_ms, &attributes),
            REQUEST_LATENCY,
        );
    }
}
