//! Per-tenant `submit_sm` send-rate limiting, built on the same
//! `tower_resilience_ratelimiter` primitive the HTTP channel uses for its
//! per-tenant request gate. One gate per pool: a send waits up to
//! `timeout` for a permit before failing transiently, independent of the
//! pool's connection-count cap.

use message_hub_domain::RateSettings;
use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};
use tower_resilience_ratelimiter::{RateLimiterConfig, RateLimiterError};

#[derive(Clone)]
struct NoopGate;

impl Service<()> for NoopGate {
    type Response = ();
    type Error = Infallible;
    type Future = std::future::Ready<Result<(), Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: ()) -> Self::Future {
        std::future::ready(Ok(()))
    }
}

type Gate = tower_resilience_ratelimiter::RateLimiter<NoopGate>;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SmppRateLimiter {
    gate: Gate,
}

impl SmppRateLimiter {
    pub fn new(settings: &RateSettings) -> Self {
        let layer = RateLimiterConfig::builder()
            .limit_for_period(settings.max_messages_per_second.max(1) as usize)
            .refresh_period(Duration::from_millis(settings.window_ms.max(1)))
            .timeout_duration(ACQUIRE_TIMEOUT)
            .build();
        Self {
            gate: layer.layer(NoopGate),
        }
    }

    /// Waits for a send permit, bounded by `ACQUIRE_TIMEOUT`.
    pub async fn acquire(&self) -> Result<(), RateLimiterError> {
        self.gate.clone().call(()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permits_up_to_the_configured_limit() {
        let limiter = SmppRateLimiter::new(&RateSettings {
            max_messages_per_second: 2,
            burst: 2,
            window_ms: 1000,
        });
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
    }
}
