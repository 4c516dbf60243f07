//! Retry policy: combines a backoff strategy with an error predicate.

use crate::backoff::IntervalFunction;
use std::sync::Arc;
use std::time::Duration;

/// A predicate deciding whether a given error should be retried.
///
/// Defaults to retrying every error when not set on a [`RetryPolicy`].
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Combines a backoff strategy with an optional retry predicate.
pub struct RetryPolicy<E> {
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Creates a new policy with the given backoff strategy and no predicate
    /// (all errors are retried).
    pub fn new(interval_fn: Arc<dyn IntervalFunction>) -> Self {
        Self {
            interval_fn,
            retry_predicate: None,
        }
    }

    /// Returns whether `error` should trigger a retry.
    ///
    /// With no predicate configured, every error is retryable.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }

    /// Returns the delay to wait before retry attempt `attempt` (0-indexed).
    pub fn next_backoff(&self, attempt: usize) -> Duration {
        self.interval_fn.next_interval(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::FixedInterval;

    #[test]
    fn retries_everything_without_predicate() {
        let policy: RetryPolicy<std::io::Error> =
            RetryPolicy::new(Arc::new(FixedInterval::new(Duration::from_millis(10))));
        assert!(policy.should_retry(&std::io::Error::other("boom")));
    }

    #[test]
    fn predicate_filters_errors() {
        let mut policy: RetryPolicy<i32> =
            RetryPolicy::new(Arc::new(FixedInterval::new(Duration::from_millis(10))));
        policy.retry_predicate = Some(Arc::new(|err: &i32| *err != 0));

        assert!(policy.should_retry(&1));
        assert!(!policy.should_retry(&0));
    }

    #[test]
    fn delegates_backoff_to_interval_fn() {
        let policy: RetryPolicy<()> =
            RetryPolicy::new(Arc::new(FixedInterval::new(Duration::from_millis(25))));
        assert_eq!(policy.next_backoff(5), Duration::from_millis(25));
    }
}
