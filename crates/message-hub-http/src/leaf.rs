//! The leaf `tower::Service`: one `reqwest` POST per call, with no
//! resilience behavior of its own. Everything in [`crate::pipeline`] wraps
//! this.

use std::collections::HashMap;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// Every failure mode the HTTP channel can surface, from the leaf send up
/// through the rate limiter and resilience pipeline that wrap it.
#[derive(Debug, thiserror::Error, Clone)]
pub enum HttpSendError {
    #[error("request to provider failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("circuit breaker open for this tenant")]
    CircuitOpen,

    #[error("rate limit exceeded for this tenant")]
    RateLimited,
}

impl From<tower_resilience_timelimiter::TimeLimiterError<HttpSendError>> for HttpSendError {
    fn from(err: tower_resilience_timelimiter::TimeLimiterError<HttpSendError>) -> Self {
        match err {
            tower_resilience_timelimiter::TimeLimiterError::Timeout => HttpSendError::Timeout,
            tower_resilience_timelimiter::TimeLimiterError::Inner(inner) => inner,
        }
    }
}

/// Flattens the full pipeline error (circuit breaker wrapping a timeout
/// wrapping the leaf send) back down to one [`HttpSendError`].
impl
    From<
        tower_resilience_circuitbreaker::CircuitBreakerError<
            tower_resilience_timelimiter::TimeLimiterError<HttpSendError>,
        >,
    > for HttpSendError
{
    fn from(
        err: tower_resilience_circuitbreaker::CircuitBreakerError<
            tower_resilience_timelimiter::TimeLimiterError<HttpSendError>,
        >,
    ) -> Self {
        match err {
            tower_resilience_circuitbreaker::CircuitBreakerError::OpenCircuit => {
                HttpSendError::CircuitOpen
            }
            tower_resilience_circuitbreaker::CircuitBreakerError::Inner(inner) => inner.into(),
        }
    }
}

/// A fully assembled outbound request: method is always POST, matching
/// every supported provider's delivery endpoint.
#[derive(Debug, Clone)]
pub struct HttpRequestSpec {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpRawResponse {
    pub status: u16,
    pub body: String,
}

/// Wraps a shared [`reqwest::Client`] as a `tower::Service`. Cheap to clone:
/// the client itself is reference-counted internally by `reqwest`.
#[derive(Clone)]
pub struct HttpLeafService {
    client: reqwest::Client,
}

impl HttpLeafService {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Service<HttpRequestSpec> for HttpLeafService {
    type Response = HttpRawResponse;
    type Error = HttpSendError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HttpRequestSpec) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let mut builder = client
                .post(&req.url)
                .timeout(req.timeout)
                .json(&req.body);
            for (name, value) in &req.headers {
                builder = builder.header(name, value);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| HttpSendError::Request(e.to_string()))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| HttpSendError::Request(e.to_string()))?;

            if (200..300).contains(&status) {
                Ok(HttpRawResponse { status, body })
            } else {
                Err(HttpSendError::ProviderStatus { status, body })
            }
        })
    }
}

/// Retryable per the provider-failure classification: request timeouts,
/// `408`, `429`, and any `5xx`.
pub fn is_retryable(err: &HttpSendError) -> bool {
    match err {
        HttpSendError::Request(_) | HttpSendError::Timeout => true,
        HttpSendError::ProviderStatus { status, .. } => {
            *status == 408 || *status == 429 || (500..600).contains(status)
        }
        HttpSendError::CircuitOpen | HttpSendError::RateLimited => false,
    }
}
