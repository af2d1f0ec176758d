/// Collector module
///
/// This module groups everything that runs a gauge over time:
/// - The collection routine contract (`GaugeCollector`, `CollectionScope`)
/// - The interval backoff policy
/// - The background process and its start/stop handle
///
/// Design notes:
/// - One tokio task per gauge, owning all of its mutable state
/// - Time and timers only come from the injected `Clock`
/// - Stop is cooperative: observed while waiting, never mid-collection
///
pub mod backoff;
pub mod process;
mod routine;

pub use backoff::Backoff;
pub use process::CollectionProcess;
pub use routine::{CollectionScope, GaugeCollector};
