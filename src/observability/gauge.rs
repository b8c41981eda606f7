//! Periodic gauge collection.
//!
//! Gauge values are pulled, not pushed: callbacks are registered once and the
//! collector invokes them on a fixed interval, forwarding one observation per
//! attribute set to the sink. Attribute sets that stop appearing get a single
//! final `0` so a push-style backend does not keep reporting a stale value.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::observability::sink::{report, Attribute, TelemetrySink};

/// One value reported by a gauge callback.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeObservation {
    pub value: f64,
    pub attributes: Vec<Attribute>,
}

pub type GaugeCallback = Box<dyn Fn() -> Vec<GaugeObservation> + Send + Sync>;

struct RegisteredGauge {
    name: &'static str,
    callback: GaugeCallback,
    reported: HashSet<Vec<Attribute>>,
}

/// Owns gauge callbacks and drives them.
pub struct GaugeCollector {
    sink: Arc<dyn TelemetrySink>,
    gauges: Vec<RegisteredGauge>,
}

impl GaugeCollector {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            gauges: Vec::new(),
        }
    }

    /// Register `callback` as the source of gauge `name`.
    pub fn register<F>(&mut self, name: &'static str, callback: F)
    where
        F: Fn() -> Vec<GaugeObservation> + Send + Sync + 'static,
    {
        self.gauges.push(RegisteredGauge {
            name,
            callback: Box::new(callback),
            reported: HashSet::new(),
        });
    }

    pub fn gauge_count(&self) -> usize {
        self.gauges.len()
    }

    /// Invoke every callback once and forward the observations.
    pub fn collect_once(&mut self) {
        for gauge in &mut self.gauges {
            let observations = (gauge.callback)();
            let mut seen = HashSet::with_capacity(observations.len());

            for obs in observations {
                report(self.sink.record_gauge(gauge.name, obs.value, &obs.attributes), gauge.name);
                seen.insert(obs.attributes);
            }
            for departed in gauge.reported.difference(&seen) {
                report(self.sink.record_gauge(gauge.name, 0.0, departed), gauge.name);
            }

            gauge.reported = seen;
        }
    }

    /// Collect every `interval` until shutdown is signalled.
    pub async fn run(mut self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = interval.as_secs(),
            gauges = self.gauges.len(),
            "Gauge collector starting"
        );

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.collect_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Gauge collector received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
