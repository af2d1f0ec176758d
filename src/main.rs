// ------------------------------------------------------------
// gauge-sampler demo binary
// ------------------------------------------------------------
//
// Samples the sampler's own runtime counters (METRICS) through
// one collection process per configured gauge, and writes every
// sample to the log.
//
// Responsibilities:
// - Initialize logging (RUST_LOG, default "info")
// - Load configuration (first CLI argument, default config.json)
// - Start one collection process per enabled gauge
// - Stop all of them cleanly on Ctrl-C
//
use std::sync::Arc;
use std::time::Duration;

use gauge_sampler::config::{Config, GaugeEntry};
use gauge_sampler::metrics::METRICS;
use gauge_sampler::{
    BlackholeSink, CardinalityLimit, CollectionError, CollectionScope, GaugeLabelValues,
    GaugeSink, Label, LogSink, Sampler,
};

/// How long each process gets to confirm it stopped.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let config = Config::load(&path)?;

    // --------------------------------------------------------
    // Collaborators shared by every gauge
    // --------------------------------------------------------
    let sink: Arc<dyn GaugeSink> = if config.sampler.log_samples {
        Arc::new(LogSink::default())
    } else {
        Arc::new(BlackholeSink)
    };

    let sampler = Sampler::new(sink)
        .with_filter(Arc::new(CardinalityLimit::new(
            config.sampler.max_gauge_cardinality,
        )))
        .with_gauge_interval(config.sampler.gauge_interval());

    // --------------------------------------------------------
    // Start gauges
    //
    // An invalid entry aborts startup: a half-configured
    // sampler is worse than none.
    // --------------------------------------------------------
    let gauges = if config.gauges.is_empty() {
        vec![default_gauge()]
    } else {
        config.gauges.clone()
    };

    let mut processes = Vec::new();
    for entry in gauges.iter().filter(|g| g.enabled) {
        let gauge = entry.to_gauge_config(sampler.gauge_interval())?;
        log::info!("starting gauge {} every {:?}", gauge.key(), gauge.interval());
        processes.push(sampler.spawn(gauge, runtime_counters));
    }

    if processes.is_empty() {
        log::warn!("no gauges enabled, nothing to do");
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down {} gauge(s)", processes.len());

    for process in &mut processes {
        process.stop();
    }
    for process in &processes {
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, process.stopped())
            .await
            .is_err()
        {
            log::warn!("gauge {} did not stop within {:?}", process.key(), SHUTDOWN_TIMEOUT);
        }
    }

    Ok(())
}

fn default_gauge() -> GaugeEntry {
    GaugeEntry {
        key: vec!["sampler".into(), "runtime".into()],
        labels: Default::default(),
        interval_secs: None,
        enabled: true,
    }
}

/// One value per runtime counter, labelled `counter=<name>`.
async fn runtime_counters(_scope: CollectionScope) -> Result<Vec<GaugeLabelValues>, CollectionError> {
    let snapshot = METRICS.snapshot();

    Ok(snapshot
        .counters()
        .into_iter()
        .map(|(name, value)| GaugeLabelValues::new(vec![Label::new("counter", name)], value as f64))
        .collect())
}
