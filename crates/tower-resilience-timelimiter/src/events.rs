//! Events emitted by the time limiter pattern.

use std::time::{Duration, Instant};
use tower_resilience_core::events::ResilienceEvent;

/// Events emitted by a [`crate::TimeLimiter`]-wrapped service.
#[derive(Debug, Clone)]
pub enum TimeLimiterEvent {
    /// The inner call completed successfully within the timeout.
    Success {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The inner call returned an error within the timeout.
    Error {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The inner call did not complete before `timeout_duration` elapsed.
    Timeout {
        pattern_name: String,
        timestamp: Instant,
        timeout_duration: Duration,
    },
}

impl ResilienceEvent for TimeLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeLimiterEvent::Success { .. } => "success",
            TimeLimiterEvent::Error { .. } => "error",
            TimeLimiterEvent::Timeout { .. } => "timeout",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeLimiterEvent::Success { timestamp, .. }
            | TimeLimiterEvent::Error { timestamp, .. }
            | TimeLimiterEvent::Timeout { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TimeLimiterEvent::Success { pattern_name, .. }
            | TimeLimiterEvent::Error { pattern_name, .. }
            | TimeLimiterEvent::Timeout { pattern_name, .. } => pattern_name,
        }
    }
}
