//! The hub-wide error taxonomy, grounded on the teacher's per-crate
//! `thiserror`-derived error enums (`CircuitBreakerError`, `BulkheadError`,
//! ...): each failure mode is a named variant rather than an opaque string,
//! and `is_transient` is the single place that decides retry-vs-fail.

use thiserror::Error;

/// Errors recognised by the submission handler, channels, and delivery
/// worker.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("unknown tenant: {0}")]
    UnknownTenant(String),

    #[error("channel {channel} is not configured for tenant {tenant}")]
    ChannelNotConfigured { tenant: String, channel: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("message {0} not found")]
    MessageNotFound(uuid::Uuid),

    #[error("channel configuration error: {0}")]
    Configuration(String),

    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("rate limit exceeded for tenant {0}")]
    RateLimited(String),

    #[error("circuit breaker open for tenant {0}")]
    CircuitOpen(String),

    #[error("permanent provider error: {0}")]
    PermanentProvider(String),

    #[error("failed to queue message for processing")]
    QueuePublishFailed,

    #[error("repository error: {0}")]
    Repository(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

impl HubError {
    /// Whether the delivery worker should let the queue redeliver this
    /// failure rather than terminating the message as `Failed`.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HubError::TransientNetwork(_) | HubError::RateLimited(_) | HubError::CircuitOpen(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_rate_and_breaker_errors_are_transient() {
        assert!(HubError::TransientNetwork("timeout".into()).is_transient());
        assert!(HubError::RateLimited("demo".into()).is_transient());
        assert!(HubError::CircuitOpen("demo".into()).is_transient());
        assert!(!HubError::PermanentProvider("400".into()).is_transient());
        assert!(!HubError::Validation("bad input".into()).is_transient());
    }
}
