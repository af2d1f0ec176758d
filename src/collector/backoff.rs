use std::time::Duration;

/// Interval backoff for a single gauge.
///
/// After every cycle the elapsed collection time is compared with 1% of
/// the original interval. Slower cycles double the current interval.
///
/// There is no way back down and no ceiling: once lengthened, the
/// interval stays lengthened until the process is recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    original: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(original: Duration) -> Self {
        Self {
            original,
            current: original,
        }
    }

    pub fn original(&self) -> Duration {
        self.original
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Longest collection that leaves the interval untouched.
    pub fn threshold(&self) -> Duration {
        self.original / 100
    }

    /// Applies one cycle's elapsed time.
    ///
    /// Returns the new interval when it changed, so the caller knows to
    /// replace its ticker.
    pub fn observe(&mut self, elapsed: Duration) -> Option<Duration> {
        if elapsed <= self.threshold() {
            return None;
        }

        // Saturates instead of overflowing, not a cap
        self.current = self.current.checked_mul(2).unwrap_or(Duration::MAX);
        Some(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_HOURS: Duration = Duration::from_secs(2 * 60 * 60);

    #[test]
    fn threshold_is_one_percent_of_original() {
        assert_eq!(Backoff::new(TWO_HOURS).threshold(), Duration::from_secs(72));
    }

    #[test]
    fn slow_cycle_doubles_interval() {
        let mut backoff = Backoff::new(TWO_HOURS);

        assert_eq!(backoff.observe(Duration::from_secs(73)), Some(2 * TWO_HOURS));
        assert_eq!(backoff.current(), Duration::from_secs(4 * 60 * 60));
        assert_eq!(backoff.original(), TWO_HOURS);
    }

    #[test]
    fn fast_cycle_keeps_interval() {
        let mut backoff = Backoff::new(TWO_HOURS);

        assert_eq!(backoff.observe(Duration::from_secs(60)), None);
        assert_eq!(backoff.current(), TWO_HOURS);
    }

    #[test]
    fn elapsed_equal_to_threshold_keeps_interval() {
        let mut backoff = Backoff::new(TWO_HOURS);
        assert_eq!(backoff.observe(Duration::from_secs(72)), None);
    }

    #[test]
    fn threshold_stays_tied_to_original_interval() {
        let mut backoff = Backoff::new(TWO_HOURS);
        backoff.observe(Duration::from_secs(73));

        // 73s is still over 1% of the original, even at 4h
        assert_eq!(backoff.observe(Duration::from_secs(73)), Some(4 * TWO_HOURS));
        assert_eq!(backoff.threshold(), Duration::from_secs(72));
    }

    #[test]
    fn fast_cycles_never_shrink_interval() {
        let mut backoff = Backoff::new(TWO_HOURS);
        backoff.observe(Duration::from_secs(100));

        for _ in 0..10 {
            backoff.observe(Duration::ZERO);
        }

        assert_eq!(backoff.current(), 2 * TWO_HOURS);
    }

    #[test]
    fn doubling_saturates() {
        let mut backoff = Backoff::new(Duration::MAX / 2 + Duration::from_secs(1));
        assert_eq!(backoff.observe(Duration::MAX), Some(Duration::MAX));
        assert_eq!(backoff.observe(Duration::MAX), Some(Duration::MAX));
    }
}
