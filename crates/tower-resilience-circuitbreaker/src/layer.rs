use crate::config::CircuitBreakerConfig;
use crate::CircuitBreaker;
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that applies circuit breaker behavior to an inner service.
///
/// # Example
///
/// ```rust
/// use tower::{ServiceBuilder, service_fn};
/// use tower_resilience_circuitbreaker::CircuitBreakerLayer;
///
/// let layer = CircuitBreakerLayer::<String, std::io::Error>::builder()
///     .failure_rate_threshold(0.5)
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
/// ```
pub struct CircuitBreakerLayer<Res, Err> {
    config: Arc<CircuitBreakerConfig<Res, Err>>,
}

impl<Res, Err> Clone for CircuitBreakerLayer<Res, Err> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<Res, Err> CircuitBreakerLayer<Res, Err> {
    /// Creates a new `CircuitBreakerLayer` from the given configuration.
    pub(crate) fn new(config: impl Into<Arc<CircuitBreakerConfig<Res, Err>>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Creates a new builder for configuring a circuit breaker layer.
    pub fn builder() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        crate::CircuitBreakerConfigBuilder::new()
    }

    /// Wraps the given service directly, returning the `CircuitBreaker` service.
    ///
    /// Useful when direct access is needed, e.g. to call `with_fallback()` or
    /// the state inspection methods.
    pub fn layer_fn<S>(&self, service: S) -> CircuitBreaker<S, (), Res, Err> {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }

    // =========================================================================
    // Presets
    // =========================================================================

    /// Preset: standard, balanced circuit breaker.
    ///
    /// 50% failure rate threshold, 100-call sliding window, 30s wait in open,
    /// 3 permitted calls in half-open.
    pub fn standard() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        use std::time::Duration;
        Self::builder()
            .failure_rate_threshold(0.5)
            .sliding_window_size(100)
            .wait_duration_in_open(Duration::from_secs(30))
            .permitted_calls_in_half_open(3)
    }

    /// Preset: fast-fail circuit breaker for latency-sensitive scenarios.
    ///
    /// 25% failure rate threshold, 20-call sliding window, 10s wait in open,
    /// 1 permitted call in half-open.
    pub fn fast_fail() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        use std::time::Duration;
        Self::builder()
            .failure_rate_threshold(0.25)
            .sliding_window_size(20)
            .wait_duration_in_open(Duration::from_secs(10))
            .permitted_calls_in_half_open(1)
    }

    /// Preset: tolerant circuit breaker for flaky downstreams.
    ///
    /// 75% failure rate threshold, 200-call sliding window, 60s wait in open,
    /// 5 permitted calls in half-open.
    pub fn tolerant() -> crate::CircuitBreakerConfigBuilder<Res, Err> {
        use std::time::Duration;
        Self::builder()
            .failure_rate_threshold(0.75)
            .sliding_window_size(200)
            .wait_duration_in_open(Duration::from_secs(60))
            .permitted_calls_in_half_open(5)
    }
}

impl<S, Req, Res, Err> Layer<S> for CircuitBreakerLayer<Res, Err> {
    type Service = CircuitBreaker<S, Req, Res, Err>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }
}
