//! Backoff strategies for the retry pattern.
//!
//! An [`IntervalFunction`] computes the delay to wait before a given retry
//! attempt. Attempt numbers are 0-indexed: `attempt == 0` is the delay before
//! the first retry (i.e. after the initial call fails).

use std::sync::Arc;
use std::time::Duration;

/// Computes the delay before a retry attempt.
///
/// Implementations must be safe to share across concurrent calls, since a
/// single [`crate::RetryConfig`] (and its interval function) is held behind
/// an `Arc` and reused by every clone of a [`crate::Retry`] service.
pub trait IntervalFunction: Send + Sync {
    /// Returns the delay to wait before retry attempt `attempt` (0-indexed).
    fn next_interval(&self, attempt: usize) -> Duration;
}

/// Always waits the same fixed duration between attempts.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    /// Creates a fixed interval backoff with the given delay.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _attempt: usize) -> Duration {
        self.interval
    }
}

/// Doubles the delay on each attempt, starting from `initial_interval`.
///
/// The computed delay is capped at `max_interval` (default 1 minute) to
/// avoid unbounded waits on deep retry chains.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff starting at `initial_interval`, doubling
    /// each attempt, capped at 1 minute.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: Duration::from_secs(60),
        }
    }

    /// Sets the growth multiplier applied on each successive attempt.
    ///
    /// Default: 2.0 (doubling).
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the ceiling on the computed delay.
    ///
    /// Default: 60 seconds.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let millis = (self.initial_interval.as_millis() as f64 * factor).min(u64::MAX as f64);
        Duration::from_millis(millis as u64).min(self.max_interval)
    }
}

/// Exponential backoff with full jitter, as described in the AWS
/// "Exponential Backoff and Jitter" architecture blog post.
///
/// The delay grows exponentially like [`ExponentialBackoff`], then a random
/// fraction of it (controlled by `randomization_factor`) is shaved off to
/// avoid synchronized retry storms across clients.
#[derive(Clone)]
pub struct ExponentialRandomBackoff {
    base: ExponentialBackoff,
    randomization_factor: f64,
    rng_fn: Arc<dyn Fn() -> f64 + Send + Sync>,
}

impl ExponentialRandomBackoff {
    /// Creates a jittered exponential backoff starting at `initial_interval`
    /// with the given randomization factor, in `[0.0, 1.0]`.
    ///
    /// A factor of 0.5 means the actual delay is uniformly distributed in
    /// `[delay * 0.5, delay]`.
    pub fn new(initial_interval: Duration, randomization_factor: f64) -> Self {
        Self {
            base: ExponentialBackoff::new(initial_interval),
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
            rng_fn: Arc::new(random_unit),
        }
    }

    /// Sets the growth multiplier applied on each successive attempt.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.base = self.base.multiplier(multiplier);
        self
    }

    /// Sets the ceiling on the computed delay, before jitter is applied.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.base = self.base.max_interval(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        let base_delay = self.base.next_interval(attempt);
        let jitter_span = base_delay.mul_f64(self.randomization_factor);
        let floor = base_delay - jitter_span;
        floor + jitter_span.mul_f64((self.rng_fn)())
    }
}

fn random_unit() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hash, Hasher};
    use std::time::Instant;

    let mut hasher = RandomState::new().build_hasher();
    Instant::now().hash(&mut hasher);
    (hasher.finish() % 1_000_000) as f64 / 1_000_000.0
}

/// Wraps a plain closure as an [`IntervalFunction`].
pub struct FnInterval<F>(F);

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Creates a backoff strategy from a closure mapping attempt number to delay.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, attempt: usize) -> Duration {
        (self.0)(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_interval_is_constant() {
        let backoff = FixedInterval::new(Duration::from_millis(50));
        assert_eq!(backoff.next_interval(0), Duration::from_millis(50));
        assert_eq!(backoff.next_interval(10), Duration::from_millis(50));
    }

    #[test]
    fn exponential_backoff_doubles() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100));
        assert_eq!(backoff.next_interval(0), Duration::from_millis(100));
        assert_eq!(backoff.next_interval(1), Duration::from_millis(200));
        assert_eq!(backoff.next_interval(2), Duration::from_millis(400));
    }

    #[test]
    fn exponential_backoff_caps_at_max() {
        let backoff =
            ExponentialBackoff::new(Duration::from_secs(1)).max_interval(Duration::from_secs(5));
        assert_eq!(backoff.next_interval(10), Duration::from_secs(5));
    }

    #[test]
    fn exponential_random_backoff_stays_within_bounds() {
        let backoff = ExponentialRandomBackoff::new(Duration::from_millis(100), 0.5);
        for attempt in 0..5 {
            let delay = backoff.next_interval(attempt);
            let base = Duration::from_millis(100 * 2u64.pow(attempt as u32));
            assert!(delay <= base);
            assert!(delay >= base.mul_f64(0.5));
        }
    }

    #[test]
    fn fn_interval_calls_closure() {
        let backoff = FnInterval::new(|attempt| Duration::from_millis(attempt as u64 * 10));
        assert_eq!(backoff.next_interval(3), Duration::from_millis(30));
    }
}
