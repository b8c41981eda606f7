//! Telemetry sink abstraction.
//!
//! # Responsibilities
//! - Define the emit capability the cart core depends on
//! - Provide an in-memory sink for tests and embedders
//! - Swallow emission failures so they never reach a cart operation
//!
//! # Design Decisions
//! - Object-safe trait shared as `Arc<dyn TelemetrySink>`
//! - Every emit returns `Result`; callers route it through [`report`]
//! - Log records use a fixed field set so sinks can emit structured events

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;

/// A single metric label.
pub type Attribute = (&'static str, String);

/// Error raised by a sink that failed to accept an emission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry backend unavailable: {0}")]
    Unavailable(String),

    #[error("instrument {0} rejected the observation")]
    Rejected(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured fields attached to a request log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFields {
    pub operation: &'static str,
    pub endpoint: &'static str,
    pub user_id: Option<String>,
    pub item_id: Option<String>,
    pub quantity: Option<u32>,
    pub item_count: Option<usize>,
    pub cart_total: Option<Decimal>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: &'static str,
    pub fields: LogFields,
}

/// Destination for counters, histograms, gauges and request logs.
pub trait TelemetrySink: Send + Sync {
    fn increment_counter(&self, name: &'static str, attributes: &[Attribute]) -> Result<(), TelemetryError>;

    fn record_histogram(
        &self,
        name: &'static str,
        value: f64,
        attributes: &[Attribute],
    ) -> Result<(), TelemetryError>;

    fn record_gauge(
        &self,
        name: &'static str,
        value: f64,
        attributes: &[Attribute],
    ) -> Result<(), TelemetryError>;

    fn emit_log(&self, record: &LogRecord) -> Result<(), TelemetryError>;
}

/// Log a failed emission locally and drop it.
pub fn report(result: Result<(), TelemetryError>, instrument: &'static str) {
    if let Err(e) = result {
        tracing::warn!(instrument, error = %e, "Dropped telemetry emission");
    }
}

/// One captured emission.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Counter {
        name: &'static str,
        attributes: Vec<Attribute>,
    },
    Histogram {
        name: &'static str,
        value: f64,
        attributes: Vec<Attribute>,
    },
    Gauge {
        name: &'static str,
        value: f64,
        attributes: Vec<Attribute>,
    },
    Log(LogRecord),
}

/// Sink that keeps every emission in memory.
///
/// `set_failing(true)` makes every emit return an error without recording.
#[derive(Debug, Default)]
pub struct InMemorySink {
    emissions: Mutex<Vec<Emission>>,
    failing: AtomicBool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Attribute sets of every increment of counter `name`.
    pub fn counters(&self, name: &str) -> Vec<Vec<Attribute>> {
        self.emissions()
            .into_iter()
            .filter_map(|e| match e {
                Emission::Counter { name: n, attributes } if n == name => Some(attributes),
                _ => None,
            })
            .collect()
    }

    pub fn histograms(&self, name: &str) -> Vec<(f64, Vec<Attribute>)> {
        self.emissions()
            .into_iter()
            .filter_map(|e| match e {
                Emission::Histogram { name: n, value, attributes } if n == name => {
                    Some((value, attributes))
                }
                _ => None,
            })
            .collect()
    }

    pub fn gauges(&self, name: &str) -> Vec<(f64, Vec<Attribute>)> {
        self.emissions()
            .into_iter()
            .filter_map(|e| match e {
                Emission::Gauge { name: n, value, attributes } if n == name => {
                    Some((value, attributes))
                }
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        self.emissions()
            .into_iter()
            .filter_map(|e| match e {
                Emission::Log(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut emissions) = self.emissions.lock() {
            emissions.clear();
        }
    }

    fn push(&self, emission: Emission) -> Result<(), TelemetryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TelemetryError::Unavailable("in-memory sink set to fail".into()));
        }
        self.emissions
            .lock()
            .map_err(|_| TelemetryError::Unavailable("in-memory sink poisoned".into()))?
            .push(emission);
        Ok(())
    }
}

impl TelemetrySink for InMemorySink {
    fn increment_counter(&self, name: &'static str, attributes: &[Attribute]) -> Result<(), TelemetryError> {
        self.push(Emission::Counter {
            name,
            attributes: attributes.to_vec(),
        })
    }

    fn record_histogram(
        &self,
        name: &'static str,
        value: f64,
        attributes: &[Attribute],
    ) -> Result<(), TelemetryError> {
        if !value.is_finite() {
            return Err(TelemetryError::Rejected(name));
        }
        self.push(Emission::Histogram {
            name,
            value,
            attributes: attributes.to_vec(),
        })
    }

    fn record_gauge(
        &self,
        name: &'static str,
        value: f64,
        attributes: &[Attribute],
    ) -> Result<(), TelemetryError> {
        self.push(Emission::Gauge {
            name,
            value,
            attributes: attributes.to_vec(),
        })
    }

    fn emit_log(&self, record: &LogRecord) -> Result<(), TelemetryError> {
        self.push(Emission::Log(record.clone()))
    }
}
