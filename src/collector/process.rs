//! Gauge collection process.
//!
//! Each process is one tokio task walking this state machine:
//!
//! ```text
//! AwaitingInitialDelay ──tick──▶ Ticking ──tick──▶ Collecting ──▶ Ticking ...
//!          │                        │
//!          └────────stop────────────┴──────────▶ Stopped
//! ```
//!
//! The stop signal is only looked at while waiting. A collection in
//! flight always completes, and a slow one simply delays the next tick.
//! A panicking routine is treated like a failed one.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::{oneshot, watch};

use crate::clock::{Clock, Ticker};
use crate::collector::backoff::Backoff;
use crate::collector::routine::{CollectionScope, GaugeCollector};
use crate::config::GaugeConfig;
use crate::error::CollectionError;
use crate::filter::GaugeFilter;
use crate::metrics::METRICS;
use crate::schema::{GaugeLabelValues, Label, MetricKey};
use crate::sink::GaugeSink;
use crate::util::jittered_delay;

/// Share of the original interval offered to each collection call.
const SCOPE_BUDGET_DIVISOR: u32 = 10;

/// Handle to a running gauge collection process.
///
/// Dropping the handle without calling [`stop`](Self::stop) also stops
/// the process at its next wait point.
#[derive(Debug)]
pub struct CollectionProcess {
    key: MetricKey,
    stop: Option<oneshot::Sender<()>>,
    stopped: watch::Receiver<bool>,
}

impl CollectionProcess {
    /// Starts the background task.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(
        config: GaugeConfig,
        collector: Arc<dyn GaugeCollector>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn GaugeSink>,
        filter: Arc<dyn GaugeFilter>,
    ) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (stopped_tx, stopped_rx) = watch::channel(false);
        let key = config.key().clone();

        let process = GaugeCollectionProcess::new(config, collector, clock, sink, filter, stopped_tx);
        tokio::spawn(process.run(stop_rx));

        Self {
            key,
            stop: Some(stop_tx),
            stopped: stopped_rx,
        }
    }

    pub fn key(&self) -> &MetricKey {
        &self.key
    }

    /// Signals the process to stop.
    ///
    /// Only the first call sends anything; it returns `true`. Later calls
    /// are no-ops returning `false`.
    pub fn stop(&mut self) -> bool {
        match self.stop.take() {
            Some(tx) => {
                // Err means the task is already gone, nothing to stop
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Whether the background task has fully exited.
    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Resolves once the background task has exited.
    pub async fn stopped(&self) {
        self.completion().await
    }

    /// Detached completion future, for observers that outlive a borrow
    /// of the handle. Any number may be taken.
    pub fn completion(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut stopped = self.stopped.clone();
        async move {
            // Err: sender dropped, which only happens once the task is gone
            let _ = stopped.wait_for(|done| *done).await;
        }
    }

    /// Stops the process and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        self.stopped().await;
    }
}

enum Wake {
    Tick,
    Stop,
}

/// Publishes completion when dropped, however the task ends.
///
/// Also keeps `processes_active` balanced: counted up on creation,
/// down on drop.
struct Completion {
    stopped: watch::Sender<bool>,
}

impl Completion {
    fn new(stopped: watch::Sender<bool>) -> Self {
        METRICS.processes_active.fetch_add(1, Ordering::Relaxed);
        Self { stopped }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        METRICS.processes_active.fetch_sub(1, Ordering::Relaxed);
        METRICS.processes_stopped.fetch_add(1, Ordering::Relaxed);
        self.stopped.send_replace(true);
    }
}

/// Task-side state. Lives entirely inside the spawned task, so nothing
/// here needs synchronisation.
struct GaugeCollectionProcess {
    config: GaugeConfig,
    collector: Arc<dyn GaugeCollector>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn GaugeSink>,
    filter: Arc<dyn GaugeFilter>,

    backoff: Backoff,
    ticker: Option<Box<dyn Ticker>>,

    // Self-observation, recorded through the same sink
    collection_key: MetricKey,
    interval_key: MetricKey,
    error_key: MetricKey,
    self_labels: Vec<Label>,

    // Must stay last: fields drop in order, so the ticker is gone
    // before completion is published.
    _completion: Completion,
}

impl GaugeCollectionProcess {
    fn new(
        config: GaugeConfig,
        collector: Arc<dyn GaugeCollector>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn GaugeSink>,
        filter: Arc<dyn GaugeFilter>,
        stopped: watch::Sender<bool>,
    ) -> Self {
        let self_labels = vec![Label::new("gauge", config.key().to_string())];

        Self {
            backoff: Backoff::new(config.interval()),
            config,
            collector,
            clock,
            sink,
            filter,
            ticker: None,
            collection_key: MetricKey::new(["metrics", "collection"]),
            interval_key: MetricKey::new(["metrics", "collection", "interval"]),
            error_key: MetricKey::new(["metrics", "collection", "error"]),
            self_labels,
            _completion: Completion::new(stopped),
        }
    }

    /// Runs until stopped. Completion fires when `self` is dropped on
    /// the way out.
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        log::debug!(
            target: self.config.log_target(),
            "gauge {} started, interval {:?}",
            self.config.key(),
            self.backoff.current()
        );

        if !self.delay_start(&mut stop).await {
            loop {
                match self.next_wake(&mut stop).await {
                    Wake::Tick => self.collect_and_filter().await,
                    Wake::Stop => break,
                }
            }
        }

        log::debug!(target: self.config.log_target(), "gauge {} stopped", self.config.key());
    }

    /// Waits a random share of the interval before the first cycle.
    ///
    /// Returns `true` if stop arrived first.
    async fn delay_start(&mut self, stop: &mut oneshot::Receiver<()>) -> bool {
        let delay = jittered_delay(self.backoff.current());
        let mut delay_ticker = self.clock.new_ticker(delay);

        tokio::select! {
            biased;
            _ = stop => true,
            _ = delay_ticker.tick() => false,
        }
    }

    /// Waits for the next tick or for stop.
    ///
    /// This is the only place the interval ticker is created: on the
    /// first call, and again after a backoff dropped the old one.
    async fn next_wake(&mut self, stop: &mut oneshot::Receiver<()>) -> Wake {
        let clock = &self.clock;
        let period = self.backoff.current();
        let ticker = self.ticker.get_or_insert_with(|| clock.new_ticker(period));

        tokio::select! {
            biased;
            _ = stop => Wake::Stop,
            _ = ticker.tick() => Wake::Tick,
        }
    }

    /// One full cycle: collect, forward, then apply backoff.
    async fn collect_and_filter(&mut self) {
        self.sink
            .add_duration(&self.interval_key, self.backoff.current(), &self.self_labels);

        let start = self.clock.now();
        let scope = CollectionScope::new(start, self.backoff.original() / SCOPE_BUDGET_DIVISOR);
        let collector = &self.collector;
        let result = AssertUnwindSafe(async move { collector.collect(scope).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(CollectionError::Panicked(panic_message(&*payload))));
        let elapsed = self.clock.now().saturating_duration_since(start);

        self.sink
            .add_duration(&self.collection_key, elapsed, &self.self_labels);
        METRICS.collections.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(values) => self.forward(values),
            Err(e) => {
                log::error!(
                    target: self.config.log_target(),
                    "error collecting gauge {}: {}",
                    self.config.key(),
                    e
                );
                METRICS.collection_errors.fetch_add(1, Ordering::Relaxed);
                self.sink.incr_counter(&self.error_key, 1.0, &self.self_labels);
            }
        }

        self.apply_backoff(elapsed);
    }

    fn apply_backoff(&mut self, elapsed: Duration) {
        let Some(next) = self.backoff.observe(elapsed) else {
            return;
        };

        log::warn!(
            target: self.config.log_target(),
            "gauge {} collection took {:?}, over target {:?}; interval now {:?}",
            self.config.key(),
            elapsed,
            self.backoff.threshold(),
            next
        );
        METRICS.backoffs.fetch_add(1, Ordering::Relaxed);

        // Stop the old timer now; next_wake asks for one at the new period
        self.ticker = None;
    }

    /// Filters the values and hands the survivors to the sink.
    ///
    /// Forwarded labels are the value's own labels followed by the
    /// gauge labels.
    fn forward(&self, values: Vec<GaugeLabelValues>) {
        let collected = values.len();
        let values = self.filter.filter(values, self.config.labels());
        let forwarded = values.len();

        for value in values {
            let mut labels = value.labels;
            labels.extend_from_slice(self.config.labels());
            self.sink.set_gauge(self.config.key(), value.value, &labels);
        }

        METRICS.values_forwarded.fetch_add(forwarded, Ordering::Relaxed);
        METRICS
            .values_filtered
            .fetch_add(collected.saturating_sub(forwarded), Ordering::Relaxed);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
