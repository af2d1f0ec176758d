//! Periodic gauge sampling.
//!
//! A [`CollectionProcess`] repeatedly invokes a caller-supplied
//! [`GaugeCollector`] on a timer, pushes the results through a
//! [`GaugeFilter`] into a [`GaugeSink`], and doubles its own interval
//! whenever a collection cycle takes longer than 1% of the configured
//! interval.
//!
//! Module layout:
//!
//! - clock:     time source + periodic tickers (real and simulated)
//! - collector: the background process, its backoff and its stop protocol
//! - config:    gauge configuration and the JSON file configuration
//! - error:     configuration and collection errors
//! - filter:    result filtering policies
//! - metrics:   runtime counters describing the sampler itself
//! - sampler:   construction entry point bundling clock, sink and filter
//! - schema:    metric keys, labels and sampled values
//! - sink:      export sinks
//! - util:      jitter helper
//!
pub mod clock;
pub mod collector;
pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod sampler;
pub mod schema;
pub mod sink;
pub mod util;

pub use clock::{Clock, SystemClock, Ticker};
pub use collector::{CollectionProcess, CollectionScope, GaugeCollector};
pub use config::GaugeConfig;
pub use error::{CollectionError, ConfigurationError};
pub use filter::{CardinalityLimit, GaugeFilter, PassThrough};
pub use sampler::Sampler;
pub use schema::{GaugeLabelValues, Label, MetricKey};
pub use sink::{BlackholeSink, GaugeSink, LogSink, MemorySink};
