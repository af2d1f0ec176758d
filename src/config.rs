use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::schema::{Label, MetricKey};

/// Default cadence for gauges that do not set their own interval.
pub const DEFAULT_GAUGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Default upper bound on values forwarded per gauge per cycle.
pub const DEFAULT_MAX_GAUGE_CARDINALITY: usize = 500;

/// Log target used when a gauge does not name its own.
pub const DEFAULT_LOG_TARGET: &str = "gauge";

// ------------------------------------------------------------
// Gauge configuration
// ------------------------------------------------------------
//
// Validated description of one gauge collection process.
//
// Invariants (checked by `GaugeConfig::new`):
// - key has at least one segment
// - interval > 0
// - label names are unique
//
// Immutable once built.
//
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeConfig {
    key: MetricKey,
    labels: Vec<Label>,
    interval: Duration,
    log_target: String,
}

impl GaugeConfig {
    pub fn new(
        key: MetricKey,
        labels: Vec<Label>,
        interval: Duration,
    ) -> Result<Self, ConfigurationError> {
        if key.is_empty() {
            return Err(ConfigurationError::EmptyKey);
        }
        if interval.is_zero() {
            return Err(ConfigurationError::ZeroInterval);
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if !seen.insert(label.name.as_str()) {
                return Err(ConfigurationError::DuplicateLabel(label.name.clone()));
            }
        }

        Ok(Self {
            key,
            labels,
            interval,
            log_target: DEFAULT_LOG_TARGET.to_string(),
        })
    }

    /// Sends this gauge's log records to `target` instead of `"gauge"`.
    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    pub fn key(&self) -> &MetricKey {
        &self.key
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn log_target(&self) -> &str {
        &self.log_target
    }
}

// ------------------------------------------------------------
// File configuration
// ------------------------------------------------------------
//
// Loaded from `config.json` by the binary.
//
// Every field has a default, so an empty object (or a missing
// file) yields a runnable configuration.
//
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Settings shared by every gauge
    pub sampler: SamplerConfig,

    /// Gauges to start
    pub gauges: Vec<GaugeEntry>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplerConfig {
    /// Interval applied to gauges without `interval_secs`
    pub gauge_interval_secs: u64,

    /// Top-N values kept per cycle (by value, descending)
    pub max_gauge_cardinality: usize,

    /// Write every forwarded sample to the log
    ///
    /// When false, samples go to a blackhole sink.
    pub log_samples: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            gauge_interval_secs: DEFAULT_GAUGE_INTERVAL.as_secs(),
            max_gauge_cardinality: DEFAULT_MAX_GAUGE_CARDINALITY,
            log_samples: true,
        }
    }
}

impl SamplerConfig {
    pub fn gauge_interval(&self) -> Duration {
        Duration::from_secs(self.gauge_interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GaugeEntry {
    /// Metric key segments, e.g. ["sampler", "runtime"]
    pub key: Vec<String>,

    /// Labels attached to every value of this gauge
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Per-gauge override of `sampler.gauge_interval_secs`
    pub interval_secs: Option<u64>,

    /// Disabled gauges are skipped at startup
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl GaugeEntry {
    /// Validates the entry into a [`GaugeConfig`].
    pub fn to_gauge_config(&self, default_interval: Duration) -> Result<GaugeConfig, ConfigurationError> {
        let interval = self
            .interval_secs
            .map(Duration::from_secs)
            .unwrap_or(default_interval);

        let labels = self
            .labels
            .iter()
            .map(|(name, value)| Label::new(name, value))
            .collect();

        GaugeConfig::new(MetricKey::new(self.key.iter().cloned()), labels, interval)
    }
}

impl Config {
    /// Reads and parses a JSON configuration file.
    ///
    /// A missing file is not an error: defaults are returned.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data = match fs::read_to_string(path.as_ref()) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!(
                    "config file {} not found, using defaults",
                    path.as_ref().display()
                );
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let cfg = serde_json::from_str(&data)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> MetricKey {
        MetricKey::new(["example", "count"])
    }

    #[test]
    fn rejects_empty_key() {
        let err = GaugeConfig::new(MetricKey::new(Vec::<String>::new()), vec![], Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyKey);
    }

    #[test]
    fn rejects_zero_interval() {
        let err = GaugeConfig::new(key(), vec![], Duration::ZERO).unwrap_err();
        assert_eq!(err, ConfigurationError::ZeroInterval);
    }

    #[test]
    fn rejects_duplicate_label_names() {
        let labels = vec![Label::new("gauge", "a"), Label::new("gauge", "b")];
        let err = GaugeConfig::new(key(), labels, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateLabel("gauge".into()));
    }

    #[test]
    fn log_target_defaults_and_overrides() {
        let cfg = GaugeConfig::new(key(), vec![], Duration::from_secs(1)).unwrap();
        assert_eq!(cfg.log_target(), DEFAULT_LOG_TARGET);

        let cfg = cfg.with_log_target("kv.count");
        assert_eq!(cfg.log_target(), "kv.count");
    }

    #[test]
    fn empty_file_config_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert!(cfg.gauges.is_empty());
        assert_eq!(cfg.sampler.gauge_interval(), DEFAULT_GAUGE_INTERVAL);
        assert_eq!(cfg.sampler.max_gauge_cardinality, DEFAULT_MAX_GAUGE_CARDINALITY);
        assert!(cfg.sampler.log_samples);
    }

    #[test]
    fn gauge_entry_falls_back_to_sampler_interval() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "sampler": { "gauge_interval_secs": 30 },
                "gauges": [
                    { "key": ["a"], "labels": { "env": "dev" } },
                    { "key": ["b"], "interval_secs": 5, "enabled": false }
                ]
            }"#,
        )
        .unwrap();

        let default_interval = cfg.sampler.gauge_interval();
        let a = cfg.gauges[0].to_gauge_config(default_interval).unwrap();
        let b = cfg.gauges[1].to_gauge_config(default_interval).unwrap();

        assert!(cfg.gauges[0].enabled);
        assert!(!cfg.gauges[1].enabled);
        assert_eq!(a.interval(), Duration::from_secs(30));
        assert_eq!(a.labels(), &[Label::new("env", "dev")]);
        assert_eq!(b.interval(), Duration::from_secs(5));
    }

    #[test]
    fn gauge_entry_with_zero_interval_is_rejected() {
        let entry: GaugeEntry =
            serde_json::from_str(r#"{ "key": ["a"], "interval_secs": 0 }"#).unwrap();
        assert_eq!(
            entry.to_gauge_config(DEFAULT_GAUGE_INTERVAL).unwrap_err(),
            ConfigurationError::ZeroInterval
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = Config::load("/nonexistent/gauge-sampler/config.json").unwrap();
        assert!(cfg.gauges.is_empty());
    }
}
