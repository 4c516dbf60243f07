//! Events emitted by the rate limiter pattern.

use std::time::{Duration, Instant};
use tower_resilience_core::events::ResilienceEvent;

/// Events emitted by a [`crate::RateLimiterLayer`]-wrapped service.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A permit was acquired, possibly after waiting.
    PermitAcquired {
        pattern_name: String,
        timestamp: Instant,
        wait_duration: Duration,
    },
    /// A permit could not be acquired within `timeout_duration`.
    PermitRejected {
        pattern_name: String,
        timestamp: Instant,
        timeout_duration: Duration,
    },
    /// The permit pool was refreshed at a period boundary.
    PermitsRefreshed {
        pattern_name: String,
        timestamp: Instant,
        available_permits: usize,
    },
}

impl ResilienceEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
            RateLimiterEvent::PermitRejected { .. } => "permit_rejected",
            RateLimiterEvent::PermitsRefreshed { .. } => "permits_refreshed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. }
            | RateLimiterEvent::PermitRejected { timestamp, .. }
            | RateLimiterEvent::PermitsRefreshed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { pattern_name, .. }
            | RateLimiterEvent::PermitRejected { pattern_name, .. }
            | RateLimiterEvent::PermitsRefreshed { pattern_name, .. } => pattern_name,
        }
    }
}
