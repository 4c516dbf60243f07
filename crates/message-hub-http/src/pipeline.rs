//! Per-tenant resilience pipeline assembly: timeout, then retry, then
//! circuit breaker, wrapping the `reqwest` leaf service. One pipeline
//! instance per tenant, cached for the lifetime of the process.
//!
//! Layering order follows `ServiceBuilder`'s rule that the first `.layer()`
//! call becomes outermost: circuit breaker wraps retry wraps timeout wraps
//! the leaf, so a request flows circuit-breaker -> retry -> timeout -> send.

use crate::leaf::{is_retryable, HttpLeafService, HttpRequestSpec, HttpSendError};
use dashmap::DashMap;
use message_hub_domain::CircuitBreakerSettings;
use std::time::Duration;
use tower::{Service, ServiceBuilder, ServiceExt};
use tower_resilience_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError};
use tower_resilience_retry::RetryConfig;
use tower_resilience_timelimiter::{TimeLimiterConfig, TimeLimiterError};

type PipelineError = CircuitBreakerError<TimeLimiterError<HttpSendError>>;

type Pipeline = tower_resilience_circuitbreaker::CircuitBreaker<
    tower_resilience_retry::Retry<
        tower_resilience_timelimiter::TimeLimiter<HttpLeafService, HttpRequestSpec>,
        HttpRequestSpec,
        TimeLimiterError<HttpSendError>,
    >,
    HttpRequestSpec,
    crate::leaf::HttpRawResponse,
    TimeLimiterError<HttpSendError>,
>;

/// Builds a fresh pipeline for one tenant's HTTP channel settings.
pub fn build_pipeline(
    client: reqwest::Client,
    timeout: Duration,
    max_retries: usize,
    circuit_breaker: &CircuitBreakerSettings,
) -> Pipeline {
    let leaf = HttpLeafService::new(client);

    let timelimiter_layer = TimeLimiterConfig::<HttpRequestSpec>::builder()
        .timeout_duration(timeout)
        .build();

    let retry_layer = RetryConfig::<HttpRequestSpec, TimeLimiterError<HttpSendError>>::builder()
        .max_attempts(max_retries + 1)
        .exponential_backoff(Duration::from_millis(200))
        .retry_on(|err: &TimeLimiterError<HttpSendError>| match err {
            TimeLimiterError::Timeout => true,
            TimeLimiterError::Inner(inner) => is_retryable(inner),
        })
        .build();

    let failure_threshold = circuit_breaker.failure_threshold;
    let circuit_breaker_layer = CircuitBreakerConfig::<
        crate::leaf::HttpRawResponse,
        TimeLimiterError<HttpSendError>,
    >::builder()
    .failure_rate_threshold(0.5)
    .sliding_window_size(failure_threshold.max(1) as usize)
    .minimum_number_of_calls(failure_threshold.max(1) as usize)
    .wait_duration_in_open(circuit_breaker.recovery_timeout)
    .permitted_calls_in_half_open(1)
    .build();

    ServiceBuilder::new()
        .layer(circuit_breaker_layer)
        .layer(retry_layer)
        .layer(timelimiter_layer)
        .service(leaf)
}

/// Cache of assembled pipelines, one per tenant. Rebuilt only if a tenant's
/// HTTP channel configuration changes at startup; the hub does not currently
/// support hot-reloading provider settings.
///
/// Every layer in [`Pipeline`] is `Clone` over an `Arc`-backed inner state,
/// so each call clones its tenant's pipeline out of the cache rather than
/// serializing calls behind a lock or boxing the service.
#[derive(Default)]
pub struct PipelineCache {
    pipelines: DashMap<String, Pipeline>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self {
            pipelines: DashMap::new(),
        }
    }

    pub fn get_or_build(
        &self,
        tenant: &str,
        client: &reqwest::Client,
        timeout: Duration,
        max_retries: usize,
        circuit_breaker: &CircuitBreakerSettings,
    ) -> Pipeline {
        self.pipelines
            .entry(tenant.to_string())
            .or_insert_with(|| {
                build_pipeline(client.clone(), timeout, max_retries, circuit_breaker)
            })
            .clone()
    }
}

/// Drives one request through a tenant's pipeline, flattening the wrapped
/// error type back down to [`HttpSendError`].
pub async fn send_through(
    mut pipeline: Pipeline,
    req: HttpRequestSpec,
) -> Result<crate::leaf::HttpRawResponse, HttpSendError> {
    pipeline
        .ready()
        .await
        .map_err(flatten_error)?
        .call(req)
        .await
        .map_err(flatten_error)
}

fn flatten_error(err: PipelineError) -> HttpSendError {
    err.into()
}
