//! Emitter boundary
//!
//! Computed results cross this boundary as open maps: metric name to value,
//! property name to string. Internal result types stay strongly typed; the
//! conversion happens here and nowhere else. Delivery is best-effort — a sink
//! failure never changes what was computed.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::info;

use crate::error::Result;

/// Free-form properties attached to a monitoring event
pub type Properties = BTreeMap<String, String>;

/// Receives bulk metrics and named binary artifacts
pub trait MetricsSink {
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()>;
    fn log_artifact(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// Receives structured monitoring events
pub trait EventSink {
    fn log_event(&self, name: &str, properties: &Properties);
}

/// Event sink that forwards to the `tracing` pipeline, properties serialized
/// as one JSON payload per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn log_event(&self, name: &str, properties: &Properties) {
        let payload = serde_json::to_string(properties).unwrap_or_default();
        info!(target: "driftwatch::events", event = name, custom_dimensions = %payload);
    }
}

/// In-memory sink recording everything it receives. Useful in tests and for
/// callers that post-process results themselves.
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<(String, Vec<u8>)>,
    events: Mutex<Vec<(String, Properties)>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Properties)> {
        self.events.lock().expect("events lock").clone()
    }
}

impl MetricsSink for InMemorySink {
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()> {
        for (name, value) in metrics {
            self.metrics.insert(name.clone(), *value);
        }
        Ok(())
    }

    fn log_artifact(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.artifacts.push((name.to_string(), bytes.to_vec()));
        Ok(())
    }
}

impl EventSink for InMemorySink {
    fn log_event(&self, name: &str, properties: &Properties) {
        self.events
            .lock()
            .expect("events lock")
            .push((name.to_string(), properties.clone()));
    }
}
