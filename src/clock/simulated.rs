//! Virtual time for deterministic tests.
//!
//! A [`SimulatedClock`] never fires on its own. Every ticker a process
//! requests is published as a [`SimulatedTicker`], which the test receives
//! through [`SimulatedClock::next_ticker`] and fires by hand. Virtual "now"
//! only moves when [`SimulatedClock::advance`] is called.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::{Clock, Ticker};

/// Manually driven clock.
#[derive(Debug)]
pub struct SimulatedClock {
    now: Arc<Mutex<Instant>>,
    created_tx: mpsc::UnboundedSender<SimulatedTicker>,
    created_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<SimulatedTicker>>,
}

/// Test-side view of a ticker requested from a [`SimulatedClock`].
#[derive(Debug)]
pub struct SimulatedTicker {
    period: Duration,
    fire_tx: mpsc::UnboundedSender<()>,
}

struct SimulatedTick {
    now: Arc<Mutex<Instant>>,
    fire_rx: mpsc::UnboundedReceiver<()>,
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedClock {
    /// Starts virtual time at the current real instant.
    pub fn new() -> Self {
        let (created_tx, created_rx) = mpsc::unbounded_channel();
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
            created_tx,
            created_rx: tokio::sync::Mutex::new(created_rx),
        }
    }

    /// Moves virtual time forward.
    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }

    /// Waits up to `wait` (real time) for the next ticker request.
    pub async fn next_ticker(&self, wait: Duration) -> Option<SimulatedTicker> {
        let mut created = self.created_rx.lock().await;
        tokio::time::timeout(wait, created.recv())
            .await
            .ok()
            .flatten()
    }

    /// Returns an already requested ticker without waiting.
    pub fn try_next_ticker(&self) -> Option<SimulatedTicker> {
        self.created_rx.try_lock().ok()?.try_recv().ok()
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Instant {
        *lock(&self.now)
    }

    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker> {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();

        // Receiver lives as long as the clock
        let _ = self.created_tx.send(SimulatedTicker { period, fire_tx });

        Box::new(SimulatedTick {
            now: self.now.clone(),
            fire_rx,
        })
    }
}

impl SimulatedTicker {
    /// Period the ticker was requested with.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Delivers one tick. Returns `false` if the ticker was already dropped.
    pub fn fire(&self) -> bool {
        self.fire_tx.send(()).is_ok()
    }

    /// Whether the owning process has discarded this ticker.
    pub fn is_stopped(&self) -> bool {
        self.fire_tx.is_closed()
    }
}

#[async_trait::async_trait]
impl Ticker for SimulatedTick {
    async fn tick(&mut self) -> Instant {
        match self.fire_rx.recv().await {
            Some(()) => *lock(&self.now),
            // Test side let go of the ticker: it never fires again
            None => std::future::pending().await,
        }
    }
}

fn lock(now: &Mutex<Instant>) -> MutexGuard<'_, Instant> {
    now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(100);

    #[test]
    fn advance_moves_now_forward() {
        let clock = SimulatedClock::new();
        let before = clock.now();

        clock.advance(Duration::from_secs(73));

        assert_eq!(clock.now() - before, Duration::from_secs(73));
    }

    #[tokio::test]
    async fn ticker_requests_are_published_in_order() {
        let clock = SimulatedClock::new();

        let _a = clock.new_ticker(Duration::from_secs(1));
        let _b = clock.new_ticker(Duration::from_secs(2));

        assert_eq!(clock.next_ticker(WAIT).await.unwrap().period(), Duration::from_secs(1));
        assert_eq!(clock.next_ticker(WAIT).await.unwrap().period(), Duration::from_secs(2));
        assert!(clock.try_next_ticker().is_none());
    }

    #[tokio::test]
    async fn fired_tick_reports_virtual_now() {
        let clock = SimulatedClock::new();
        let mut ticker = clock.new_ticker(Duration::from_secs(5));
        let handle = clock.next_ticker(WAIT).await.unwrap();

        clock.advance(Duration::from_secs(5));
        assert!(handle.fire());

        assert_eq!(ticker.tick().await, clock.now());
    }

    #[tokio::test]
    async fn dropped_ticker_is_reported_stopped() {
        let clock = SimulatedClock::new();
        let ticker = clock.new_ticker(Duration::from_secs(5));
        let handle = clock.next_ticker(WAIT).await.unwrap();

        assert!(!handle.is_stopped());
        drop(ticker);

        assert!(handle.is_stopped());
        assert!(!handle.fire());
    }

    #[tokio::test]
    async fn next_ticker_gives_up_after_wait() {
        let clock = SimulatedClock::new();
        assert!(clock.next_ticker(Duration::from_millis(10)).await.is_none());
    }
}
