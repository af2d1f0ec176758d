use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;

/// Global runtime metrics for the sampler itself.
///
/// Purpose:
/// - Track running collection processes
/// - Track cycle outcomes (collected / failed / backed off)
/// - Track how many values reached the sinks
///
/// Design:
/// - Lock-free (Atomics)
/// - Shared by every process in the binary, never reset
#[derive(Default)]
pub struct RuntimeMetrics {
    pub processes_active: AtomicUsize,
    pub processes_stopped: AtomicUsize,

    // Cycles
    pub collections: AtomicUsize,
    pub collection_errors: AtomicUsize,
    pub backoffs: AtomicUsize,

    // Values
    pub values_forwarded: AtomicUsize,
    pub values_filtered: AtomicUsize,
}

/// Point-in-time copy of [`RuntimeMetrics`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RuntimeSnapshot {
    pub processes_active: usize,
    pub processes_stopped: usize,
    pub collections: usize,
    pub collection_errors: usize,
    pub backoffs: usize,
    pub values_forwarded: usize,
    pub values_filtered: usize,
}

impl RuntimeMetrics {
    pub fn snapshot(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            processes_active: self.processes_active.load(Ordering::Relaxed),
            processes_stopped: self.processes_stopped.load(Ordering::Relaxed),
            collections: self.collections.load(Ordering::Relaxed),
            collection_errors: self.collection_errors.load(Ordering::Relaxed),
            backoffs: self.backoffs.load(Ordering::Relaxed),
            values_forwarded: self.values_forwarded.load(Ordering::Relaxed),
            values_filtered: self.values_filtered.load(Ordering::Relaxed),
        }
    }
}

impl RuntimeSnapshot {
    /// Counter name / value pairs, in a stable order.
    pub fn counters(&self) -> [(&'static str, usize); 7] {
        [
            ("processes_active", self.processes_active),
            ("processes_stopped", self.processes_stopped),
            ("collections", self.collections),
            ("collection_errors", self.collection_errors),
            ("backoffs", self.backoffs),
            ("values_forwarded", self.values_forwarded),
            ("values_filtered", self.values_filtered),
        ]
    }
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<RuntimeMetrics>> =
    Lazy::new(|| Arc::new(RuntimeMetrics::default()));
