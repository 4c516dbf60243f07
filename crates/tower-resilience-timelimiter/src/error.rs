//! Error types for the time limiter pattern.

use std::fmt;

/// Errors produced by a [`crate::TimeLimiter`]-wrapped service.
#[derive(Debug, Clone)]
pub enum TimeLimiterError<E> {
    /// The inner service did not complete within the configured timeout.
    Timeout,
    /// The inner service returned an error before the timeout elapsed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for TimeLimiterError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLimiterError::Timeout => write!(f, "call timed out"),
            TimeLimiterError::Inner(err) => write!(f, "inner service error: {err}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TimeLimiterError<E> {}

impl<E> TimeLimiterError<E> {
    /// Returns true if this error represents a timeout rather than an inner failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeLimiterError::Timeout)
    }

    /// Returns the inner error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            TimeLimiterError::Inner(e) => Some(e),
            TimeLimiterError::Timeout => None,
        }
    }
}
