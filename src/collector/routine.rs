use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::CollectionError;
use crate::schema::GaugeLabelValues;

/// Invocation scope handed to each collection call.
///
/// Carries a work budget the routine may use to bound itself. The
/// process never enforces it: an in-flight collection always runs to
/// completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionScope {
    started: Instant,
    budget: Duration,
}

impl CollectionScope {
    pub fn new(started: Instant, budget: Duration) -> Self {
        Self { started, budget }
    }

    /// Clock reading taken right before the call.
    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// `None` if the deadline is not representable.
    pub fn deadline(&self) -> Option<Instant> {
        self.started.checked_add(self.budget)
    }

    /// Budget left at `now`, zero once exhausted.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.budget
            .saturating_sub(now.saturating_duration_since(self.started))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }
}

/// Caller-supplied collection routine.
///
/// Implemented for any `Fn(CollectionScope) -> Future` closure, so most
/// callers never name this trait:
///
/// ```rust,no_run
/// # use gauge_sampler::{CollectionScope, GaugeLabelValues, CollectionError};
/// async fn count(_scope: CollectionScope) -> Result<Vec<GaugeLabelValues>, CollectionError> {
///     Ok(vec![GaugeLabelValues::new(vec![], 42.0)])
/// }
/// ```
#[async_trait::async_trait]
pub trait GaugeCollector: Send + Sync + 'static {
    async fn collect(&self, scope: CollectionScope) -> Result<Vec<GaugeLabelValues>, CollectionError>;
}

#[async_trait::async_trait]
impl<F, Fut> GaugeCollector for F
where
    F: Fn(CollectionScope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<GaugeLabelValues>, CollectionError>> + Send + 'static,
{
    async fn collect(&self, scope: CollectionScope) -> Result<Vec<GaugeLabelValues>, CollectionError> {
        (self)(scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_budget_shrinks_to_zero() {
        let start = Instant::now();
        let scope = CollectionScope::new(start, Duration::from_secs(10));

        assert_eq!(scope.remaining(start), Duration::from_secs(10));
        assert_eq!(scope.remaining(start + Duration::from_secs(4)), Duration::from_secs(6));
        assert!(!scope.is_expired(start + Duration::from_secs(9)));
        assert!(scope.is_expired(start + Duration::from_secs(10)));
        assert!(scope.is_expired(start + Duration::from_secs(60)));
    }

    #[test]
    fn deadline_is_start_plus_budget() {
        let start = Instant::now();
        let scope = CollectionScope::new(start, Duration::from_secs(10));
        assert_eq!(scope.deadline(), Some(start + Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn closures_are_collectors() {
        let collector = |scope: CollectionScope| async move {
            Ok::<_, CollectionError>(vec![GaugeLabelValues::new(
                vec![],
                scope.budget().as_secs_f64(),
            )])
        };

        let values = collector
            .collect(CollectionScope::new(Instant::now(), Duration::from_secs(3)))
            .await
            .unwrap();

        assert_eq!(values[0].value, 3.0);
    }
}
