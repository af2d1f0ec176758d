use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::collector::{CollectionProcess, GaugeCollector};
use crate::config::{GaugeConfig, DEFAULT_GAUGE_INTERVAL};
use crate::error::ConfigurationError;
use crate::filter::{GaugeFilter, PassThrough};
use crate::schema::{Label, MetricKey};
use crate::sink::GaugeSink;

/// Entry point for starting gauge collection processes.
///
/// Bundles the collaborators every process needs:
/// - the clock (real by default, swap in a `SimulatedClock` for tests)
/// - the export sink
/// - the result filter (pass-through by default)
///
/// Cheap to clone; clones share the same collaborators.
#[derive(Clone)]
pub struct Sampler {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn GaugeSink>,
    filter: Arc<dyn GaugeFilter>,
    gauge_interval: Duration,
}

impl Sampler {
    pub fn new(sink: Arc<dyn GaugeSink>) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            sink,
            filter: Arc::new(PassThrough),
            gauge_interval: DEFAULT_GAUGE_INTERVAL,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn GaugeFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Interval used by [`new_gauge_collection_process`](Self::new_gauge_collection_process).
    pub fn with_gauge_interval(mut self, interval: Duration) -> Self {
        self.gauge_interval = interval;
        self
    }

    pub fn gauge_interval(&self) -> Duration {
        self.gauge_interval
    }

    /// Validates the arguments and starts a collection process.
    ///
    /// `logger` is the log target the process reports under.
    ///
    /// # Errors
    /// [`ConfigurationError`] if the key is empty, the interval is zero,
    /// or a label name repeats. Nothing is started in that case.
    ///
    /// # Panics
    /// Outside of a tokio runtime.
    pub fn create_collection_process<C: GaugeCollector>(
        &self,
        key: MetricKey,
        labels: Vec<Label>,
        collector: C,
        interval: Duration,
        logger: &str,
    ) -> Result<CollectionProcess, ConfigurationError> {
        let config = GaugeConfig::new(key, labels, interval)?.with_log_target(logger);
        Ok(self.spawn(config, collector))
    }

    /// Like [`create_collection_process`](Self::create_collection_process),
    /// at the sampler's default gauge interval and log target.
    pub fn new_gauge_collection_process<C: GaugeCollector>(
        &self,
        key: MetricKey,
        labels: Vec<Label>,
        collector: C,
    ) -> Result<CollectionProcess, ConfigurationError> {
        let config = GaugeConfig::new(key, labels, self.gauge_interval)?;
        Ok(self.spawn(config, collector))
    }

    /// Starts a collection process from an already validated config.
    pub fn spawn<C: GaugeCollector>(&self, config: GaugeConfig, collector: C) -> CollectionProcess {
        CollectionProcess::spawn(
            config,
            Arc::new(collector),
            self.clock.clone(),
            self.sink.clone(),
            self.filter.clone(),
        )
    }
}
