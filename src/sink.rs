//! Export sinks.
//!
//! A sink is the last hop of a collection cycle. The process hands it:
//! - every filtered gauge value, under the gauge key
//! - its own timing (`metrics.collection`, `metrics.collection.interval`)
//! - an error counter (`metrics.collection.error`) for failed cycles
//!
//! Sinks are shared across processes and called from their tasks, so
//! every method takes `&self` and must not block for long.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use crate::schema::{Label, MetricKey};

pub trait GaugeSink: Send + Sync {
    fn set_gauge(&self, key: &MetricKey, value: f64, labels: &[Label]);

    fn add_duration(&self, key: &MetricKey, duration: Duration, labels: &[Label]);

    fn incr_counter(&self, key: &MetricKey, count: f64, labels: &[Label]);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlackholeSink;

impl GaugeSink for BlackholeSink {
    fn set_gauge(&self, _key: &MetricKey, _value: f64, _labels: &[Label]) {}

    fn add_duration(&self, _key: &MetricKey, _duration: Duration, _labels: &[Label]) {}

    fn incr_counter(&self, _key: &MetricKey, _count: f64, _labels: &[Label]) {}
}

// ------------------------------------------------------------
// Memory sink
// ------------------------------------------------------------
//
// Keeps every call in arrival order. Used by tests and anywhere a
// caller wants to inspect what a process emitted.
//
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Recorded {
    Gauge {
        key: MetricKey,
        value: f64,
        labels: Vec<Label>,
    },
    Duration {
        key: MetricKey,
        duration: Duration,
        labels: Vec<Label>,
    },
    Counter {
        key: MetricKey,
        count: f64,
        labels: Vec<Label>,
    },
}

#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Recorded>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn records(&self) -> Vec<Recorded> {
        self.lock().clone()
    }

    /// Gauge values recorded under `key`, with their labels.
    pub fn gauges(&self, key: &MetricKey) -> Vec<(f64, Vec<Label>)> {
        self.lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::Gauge { key: k, value, labels } if k == key => {
                    Some((*value, labels.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Sum of counter increments recorded under `key`.
    pub fn counter(&self, key: &MetricKey) -> f64 {
        self.lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::Counter { key: k, count, .. } if k == key => Some(*count),
                _ => None,
            })
            .sum()
    }

    /// Durations recorded under `key`.
    pub fn durations(&self, key: &MetricKey) -> Vec<Duration> {
        self.lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::Duration { key: k, duration, .. } if k == key => Some(*duration),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: Recorded) {
        self.lock().push(record);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Recorded>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GaugeSink for MemorySink {
    fn set_gauge(&self, key: &MetricKey, value: f64, labels: &[Label]) {
        self.push(Recorded::Gauge {
            key: key.clone(),
            value,
            labels: labels.to_vec(),
        });
    }

    fn add_duration(&self, key: &MetricKey, duration: Duration, labels: &[Label]) {
        self.push(Recorded::Duration {
            key: key.clone(),
            duration,
            labels: labels.to_vec(),
        });
    }

    fn incr_counter(&self, key: &MetricKey, count: f64, labels: &[Label]) {
        self.push(Recorded::Counter {
            key: key.clone(),
            count,
            labels: labels.to_vec(),
        });
    }
}

/// Writes one JSON line per call to the `log` facade at info level.
#[derive(Debug, Clone)]
pub struct LogSink {
    target: String,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new("sample")
    }
}

impl LogSink {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }

    fn emit(&self, record: Recorded) {
        match serde_json::to_string(&record) {
            Ok(line) => log::info!(target: self.target.as_str(), "{line}"),
            Err(e) => log::warn!(target: self.target.as_str(), "unserializable sample: {e}"),
        }
    }
}

impl GaugeSink for LogSink {
    fn set_gauge(&self, key: &MetricKey, value: f64, labels: &[Label]) {
        self.emit(Recorded::Gauge {
            key: key.clone(),
            value,
            labels: labels.to_vec(),
        });
    }

    fn add_duration(&self, key: &MetricKey, duration: Duration, labels: &[Label]) {
        self.emit(Recorded::Duration {
            key: key.clone(),
            duration,
            labels: labels.to_vec(),
        });
    }

    fn incr_counter(&self, key: &MetricKey, count: f64, labels: &[Label]) {
        self.emit(Recorded::Counter {
            key: key.clone(),
            count,
            labels: labels.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_filters_by_key() {
        let sink = MemorySink::new();
        let a = MetricKey::new(["a"]);
        let b = MetricKey::new(["b"]);

        sink.set_gauge(&a, 1.0, &[Label::new("x", "1")]);
        sink.set_gauge(&b, 2.0, &[]);
        sink.incr_counter(&a, 1.0, &[]);
        sink.incr_counter(&a, 2.0, &[]);
        sink.add_duration(&b, Duration::from_secs(3), &[]);

        assert_eq!(sink.gauges(&a), vec![(1.0, vec![Label::new("x", "1")])]);
        assert_eq!(sink.counter(&a), 3.0);
        assert_eq!(sink.durations(&b), vec![Duration::from_secs(3)]);
        assert_eq!(sink.records().len(), 5);
    }
}
