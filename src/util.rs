/// Small timing helpers shared by the collection processes.
///
use std::time::Duration;

use rand::random_range;

/// Uniformly random delay in `[0, interval)`.
///
/// Spreads the first collection of many processes started at the same
/// moment (e.g. a fleet restart) across a whole interval, so they do
/// not all hit the same tick.
///
/// A zero interval yields a zero delay.
pub fn jittered_delay(interval: Duration) -> Duration {
    let nanos = u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX);
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(random_range(0..nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_below_interval() {
        let interval = Duration::from_secs(2 * 60 * 60);
        for _ in 0..1_000 {
            assert!(jittered_delay(interval) < interval);
        }
    }

    #[test]
    fn one_nanosecond_interval_means_no_delay() {
        assert_eq!(jittered_delay(Duration::from_nanos(1)), Duration::ZERO);
    }

    #[test]
    fn zero_interval_means_no_delay() {
        assert_eq!(jittered_delay(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn huge_interval_does_not_overflow() {
        assert!(jittered_delay(Duration::MAX) < Duration::MAX);
    }
}
