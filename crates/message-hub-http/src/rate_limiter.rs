//! Tenant-scoped rate limiting (C3), built on top of the single-limiter
//! primitive in `tower_resilience_ratelimiter`: one limiter instance per
//! tenant, created lazily on first send and reclaimed by an idle sweep.

use dashmap::DashMap;
use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tower_resilience_ratelimiter::{RateLimiterConfig, RateLimiterError};

/// A `Service<()>` that always succeeds immediately; the only purpose is to
/// give `RateLimiterLayer` something to gate.
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

struct TenantEntry {
    gate: Gate,
    last_used: Instant,
}

/// Per-tenant registry of rate-limiting gates. A tenant with no traffic for
/// `idle_after` is dropped on the next [`sweep_idle`](Self::sweep_idle) call;
/// the next send recreates it with a fresh permit bucket.
pub struct TenantRateLimiterRegistry {
    tenants: DashMap<String, TenantEntry>,
}

impl Default for TenantRateLimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantRateLimiterRegistry {
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
        }
    }

    /// Waits for a permit for `tenant`, creating its gate on first use.
    pub async fn acquire(
        &self,
        tenant: &str,
        max_requests_per_second: usize,
    ) -> Result<(), RateLimiterError> {
        let mut gate = {
            let mut entry = self.tenants.entry(tenant.to_string()).or_insert_with(|| {
                TenantEntry {
                    gate: build_gate(max_requests_per_second),
                    last_used: Instant::now(),
                }
            });
            entry.last_used = Instant::now();
            entry.gate.clone()
        };

        gate.call(()).await
    }

    /// Drops gates idle for longer than `idle_after`. Intended to run on a
    /// periodic background task alongside the DLR sweep.
    pub fn sweep_idle(&self, idle_after: Duration) {
        let now = Instant::now();
        self.tenants
            .retain(|_, entry| now.duration_since(entry.last_used) < idle_after);
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }
}

/// `tryAcquire` is advisory and non-blocking: a zero timeout means a
/// depleted bucket is rejected immediately rather than waited on.
fn build_gate(limit_for_period: usize) -> Gate {
    let layer = RateLimiterConfig::builder()
        .limit_for_period(limit_for_period)
        .refresh_period(Duration::from_secs(1))
        .timeout_duration(Duration::ZERO)
        .build();
    layer.layer(NoopGate)
}
