//! Public entry point for the HTTP SMS provider channel: render payload,
//! check the tenant rate limit, send through the tenant's resilience
//! pipeline, and extract the provider's external message id.

use crate::auth::build_headers;
use crate::leaf::{HttpRequestSpec, HttpSendError};
use crate::pipeline::{send_through, PipelineCache};
use crate::rate_limiter::TenantRateLimiterRegistry;
use crate::template::render_payload;
use message_hub_domain::HttpChannelConfig;
use uuid::Uuid;

/// Fields consulted, in order, to find a provider's assigned message id in
/// a successful response body.
const EXTERNAL_ID_FIELDS: &[&str] = &["messageId", "id", "message_id", "sid", "uuid", "reference"];

pub struct HttpSendOutcome {
    pub external_message_id: Option<String>,
    pub provider_status: u16,
}

/// Owns the tenant rate limiter registry and pipeline cache for the HTTP
/// channel; constructed once at startup and shared across the delivery
/// worker's tasks.
pub struct HttpChannel {
    client: reqwest::Client,
    rate_limiters: TenantRateLimiterRegistry,
    pipelines: PipelineCache,
}

impl Default for HttpChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpChannel {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            rate_limiters: TenantRateLimiterRegistry::new(),
            pipelines: PipelineCache::new(),
        }
    }

    pub async fn send(
        &self,
        tenant_key: &str,
        config: &HttpChannelConfig,
        message_id: Uuid,
        recipient: &str,
        content: &str,
    ) -> Result<HttpSendOutcome, HttpSendError> {
        self.rate_limiters
            .acquire(tenant_key, config.max_requests_per_second)
            .await
            .map_err(|_| HttpSendError::RateLimited)?;

        let body = render_payload(config, message_id, tenant_key, recipient, content);
        let body_str = body.to_string();
        let headers = build_headers(config, &body_str);

        let request = HttpRequestSpec {
            url: config.endpoint.clone(),
            headers,
            body,
            timeout: config.timeout,
        };

        let pipeline = self.pipelines.get_or_build(
            tenant_key,
            &self.client,
            config.timeout,
            config.max_retries,
            &config.circuit_breaker,
        );

        let response = send_through(pipeline, request).await?;
        let external_message_id = extract_external_id(&response.body);

        Ok(HttpSendOutcome {
            external_message_id,
            provider_status: response.status,
        })
    }

    /// Reclaims rate limiter state for tenants idle longer than `idle_after`.
    /// Intended to run periodically alongside the DLR correlation sweep.
    pub fn sweep_idle_rate_limiters(&self, idle_after: std::time::Duration) {
        self.rate_limiters.sweep_idle(idle_after);
    }
}

fn extract_external_id(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    for field in EXTERNAL_ID_FIELDS {
        if let Some(value) = parsed.get(field).and_then(|v| v.as_str()) {
            return Some(value.to_string());
        }
    }
    parsed.get("data").and_then(|data| data.get("id")).and_then(|v| v.as_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_matching_id_field_in_priority_order() {
        let body = r#"{"message_id": "abc", "id": "def"}"#;
        assert_eq!(extract_external_id(body), Some("def".to_string()));
    }

    #[test]
    fn falls_back_through_field_list() {
        let body = r#"{"uuid": "u-123"}"#;
        assert_eq!(extract_external_id(body), Some("u-123".to_string()));
    }

    #[test]
    fn falls_back_to_nested_data_id_when_no_top_level_field_matches() {
        let body = r#"{"data": {"id": "nested-1"}}"#;
        assert_eq!(extract_external_id(body), Some("nested-1".to_string()));
    }

    #[test]
    fn returns_none_when_body_has_no_known_field() {
        let body = r#"{"status": "ok"}"#;
        assert_eq!(extract_external_id(body), None);
    }

    #[test]
    fn returns_none_on_non_json_body() {
        assert_eq!(extract_external_id("not json"), None);
    }
}
