//! Clock abstraction
//!
//! Every collection process reads time and creates timers exclusively
//! through a [`Clock`] handed to it at construction. Production code uses
//! [`SystemClock`]; tests use [`SimulatedClock`] to drive virtual time and
//! to observe every timer the process asks for.
//!
//! Tickers:
//! - The first tick fires one full period after creation
//! - Dropping a ticker stops it
//! - `tick()` must be cancel-safe, it is raced against the stop signal

pub mod simulated;

use std::time::{Duration, Instant};

use tokio::time::{interval_at, Interval, MissedTickBehavior};

pub use simulated::{SimulatedClock, SimulatedTicker};

/// Source of time and periodic timers.
pub trait Clock: Send + Sync + 'static {
    /// Current monotonic time.
    fn now(&self) -> Instant;

    /// Creates a ticker firing every `period`.
    ///
    /// Timers are not retunable: a different period requires
    /// dropping the ticker and asking for a new one.
    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker>;
}

/// A periodic timer.
#[async_trait::async_trait]
pub trait Ticker: Send {
    /// Waits for the next tick and returns the instant it fired at.
    async fn tick(&mut self) -> Instant;
}

/// Wall clock backed by tokio timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker> {
        // tokio panics on a zero period
        let period = period.max(Duration::from_nanos(1));

        let mut interval = interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Box::new(SystemTicker { interval })
    }
}

struct SystemTicker {
    interval: Interval,
}

#[async_trait::async_trait]
impl Ticker for SystemTicker {
    async fn tick(&mut self) -> Instant {
        self.interval.tick().await.into_std()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn system_ticker_waits_a_full_period_before_first_tick() {
        let clock = SystemClock;
        let start = tokio::time::Instant::now();

        let mut ticker = clock.new_ticker(Duration::from_secs(30));
        ticker.tick().await;

        assert!(tokio::time::Instant::now() - start >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn system_ticker_accepts_zero_period() {
        let clock = SystemClock;
        let mut ticker = clock.new_ticker(Duration::ZERO);

        // resolves immediately instead of panicking
        ticker.tick().await;
        ticker.tick().await;
    }
}
