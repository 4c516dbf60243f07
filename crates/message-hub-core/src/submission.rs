//! Validates and persists an inbound submission, then publishes it for the
//! delivery worker. Single and batch share the same per-message flow; batch
//! just continues past individual failures instead of raising them.

use crate::config::HubConfig;
use message_hub_domain::{ChannelType, HubError, Message, MessageQueuedEvent, MessageStatus};
use message_hub_queue::QueueTransport;
use message_hub_repository::MessageRepository;
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_BATCH_SIZE: usize = 100;
const MAX_RECIPIENT_LEN: usize = 100;
const MAX_CONTENT_LEN: usize = 1600;

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub recipient: String,
    pub content: String,
    pub channel_type: String,
}

#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub message_id: Uuid,
    pub status: MessageStatus,
    pub status_url: String,
}

/// One entry of a batch result: `message_id` is absent when validation
/// failed before a row could even be created.
#[derive(Debug, Clone)]
pub struct BatchItemResult {
    pub message_id: Option<Uuid>,
    pub status: MessageStatus,
    pub recipient: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub items: Vec<BatchItemResult>,
    pub total_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
}

pub struct SubmissionHandler {
    config: Arc<HubConfig>,
    repository: Arc<dyn MessageRepository>,
    queue: Arc<dyn QueueTransport>,
}

impl SubmissionHandler {
    pub fn new(
        config: Arc<HubConfig>,
        repository: Arc<dyn MessageRepository>,
        queue: Arc<dyn QueueTransport>,
    ) -> Self {
        Self { config, repository, queue }
    }

    pub async fn submit(&self, tenant_key: &str, request: SubmitRequest) -> Result<SubmitResult, HubError> {
        let tenant = self
            .config
            .tenant(tenant_key)
            .ok_or_else(|| HubError::UnknownTenant(tenant_key.to_string()))?;

        let channel_type = ChannelType::parse(&request.channel_type)
            .ok_or_else(|| HubError::UnknownChannel(request.channel_type.clone()))?;

        if !tenant.supports(channel_type) {
            return Err(HubError::ChannelNotConfigured {
                tenant: tenant_key.to_string(),
                channel: channel_type.to_string(),
            });
        }

        validate_recipient(&request.recipient)?;
        validate_content(&request.content)?;

        let message = Message::new_queued(tenant_key, request.content, request.recipient, channel_type);
        let message_id = message.id;
        let event = MessageQueuedEvent::from(&message);

        self.repository
            .insert(message)
            .await
            .map_err(|e| HubError::Repository(e.to_string()))?;

        if let Err(publish_err) = self.queue.publish(event).await {
            self.repository
                .update_status(
                    message_id,
                    MessageStatus::Failed,
                    None,
                    Some("Failed to queue message for processing".to_string()),
                )
                .await
                .map_err(|e| HubError::Repository(e.to_string()))?;
            warn_publish_failed(message_id, &publish_err);
            return Err(HubError::QueuePublishFailed);
        }

        Ok(SubmitResult {
            message_id,
            status: MessageStatus::Queued,
            status_url: status_url(message_id),
        })
    }

    /// Validates the tenant once, then applies the single-message flow to
    /// every item, continuing past individual failures.
    pub async fn submit_batch(
        &self,
        tenant_key: &str,
        requests: Vec<SubmitRequest>,
    ) -> Result<BatchResult, HubError> {
        if requests.len() > MAX_BATCH_SIZE {
            return Err(HubError::Validation(format!(
                "batch size {} exceeds maximum of {MAX_BATCH_SIZE}",
                requests.len()
            )));
        }
        self.config
            .tenant(tenant_key)
            .ok_or_else(|| HubError::UnknownTenant(tenant_key.to_string()))?;

        let total_count = requests.len();
        let mut items = Vec::with_capacity(total_count);
        let mut success_count = 0;
        let mut failed_count = 0;

        for request in requests {
            let recipient = request.recipient.clone();
            match self.submit(tenant_key, request).await {
                Ok(result) => {
                    success_count += 1;
                    items.push(BatchItemResult {
                        message_id: Some(result.message_id),
                        status: result.status,
                        recipient,
                        error_message: None,
                    });
                }
                Err(err) => {
                    failed_count += 1;
                    items.push(BatchItemResult {
                        message_id: None,
                        status: MessageStatus::Failed,
                        recipient,
                        error_message: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(BatchResult {
            items,
            total_count,
            success_count,
            failed_count,
        })
    }
}

fn validate_recipient(recipient: &str) -> Result<(), HubError> {
    if recipient.is_empty() || recipient.chars().count() > MAX_RECIPIENT_LEN {
        return Err(HubError::Validation(format!(
            "recipient must be 1-{MAX_RECIPIENT_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), HubError> {
    if content.is_empty() || content.chars().count() > MAX_CONTENT_LEN {
        return Err(HubError::Validation(format!(
            "message must be 1-{MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}

fn status_url(message_id: Uuid) -> String {
    format!("/api/messages/{message_id}/status")
}

fn warn_publish_failed(message_id: Uuid, error: &message_hub_queue::QueueError) {
    #[cfg(feature = "tracing")]
    tracing::warn!(%message_id, %error, "failed to publish queued event");
    #[cfg(not(feature = "tracing"))]
    let _ = (message_id, error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PersistenceSettings, QueueTransportKind, ServerSettings};
    use message_hub_domain::TenantConfig;
    use message_hub_queue::InProcessQueueTransport;
    use message_hub_repository::InMemoryMessageRepository;
    use std::collections::HashMap;

    fn handler_with_tenant(channel_configured: bool) -> SubmissionHandler {
        let mut tenants = HashMap::new();
        tenants.insert(
            "demo-key".to_string(),
            TenantConfig {
                subscription_key: "demo-key".to_string(),
                name: "Demo".to_string(),
                http: if channel_configured {
                    Some(message_hub_domain::HttpChannelConfig {
                        endpoint: "https://example.com".into(),
                        api_key: None,
                        api_secret: None,
                        custom_headers: Default::default(),
                        timeout: std::time::Duration::from_secs(5),
                        max_retries: 1,
                        max_requests_per_second: 10,
                        circuit_breaker: Default::default(),
                        provider: message_hub_domain::ProviderType::Generic,
                        sender_id: None,
                        custom_payload_template: None,
                        auth_type: message_hub_domain::AuthType::Bearer,
                    })
                } else {
                    None
                },
                smpp: None,
            },
        );
        let config = Arc::new(HubConfig {
            server: ServerSettings::default(),
            persistence: PersistenceSettings::default(),
            queue_transport: QueueTransportKind::InProcess,
            tenants,
        });
        let repository = Arc::new(InMemoryMessageRepository::new());
        let queue = Arc::new(InProcessQueueTransport::new(16, 3));
        queue.subscribe(Arc::new(|_event| {
            Box::pin(async move { message_hub_queue::HandlerOutcome::Processed })
        }));
        SubmissionHandler::new(config, repository, queue)
    }

    fn request() -> SubmitRequest {
        SubmitRequest {
            recipient: "+15551234567".to_string(),
            content: "hello".to_string(),
            channel_type: "http".to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_tenant_is_rejected() {
        let handler = handler_with_tenant(true);
        let result = handler.submit("not-a-tenant", request()).await;
        assert!(matches!(result, Err(HubError::UnknownTenant(_))));
    }

    #[tokio::test]
    async fn channel_not_configured_is_rejected() {
        let handler = handler_with_tenant(false);
        let result = handler.submit("demo-key", request()).await;
        assert!(matches!(result, Err(HubError::ChannelNotConfigured { .. })));
    }

    #[tokio::test]
    async fn valid_submission_queues_and_returns_status_url() {
        let handler = handler_with_tenant(true);
        let result = handler.submit("demo-key", request()).await.unwrap();
        assert_eq!(result.status, MessageStatus::Queued);
        assert!(result.status_url.contains(&result.message_id.to_string()));
    }

    #[tokio::test]
    async fn empty_recipient_is_a_validation_error() {
        let handler = handler_with_tenant(true);
        let mut req = request();
        req.recipient = String::new();
        let result = handler.submit("demo-key", req).await;
        assert!(matches!(result, Err(HubError::Validation(_))));
    }

    #[tokio::test]
    async fn batch_partial_failure_counts_both_outcomes() {
        let handler = handler_with_tenant(true);
        let mut bad = request();
        bad.channel_type = "smpp".to_string();
        let requests = vec![request(), bad, request()];

        let result = handler.submit_batch("demo-key", requests).await.unwrap();
        assert_eq!(result.total_count, 3);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failed_count, 1);
    }

    #[tokio::test]
    async fn batch_over_max_size_is_rejected() {
        let handler = handler_with_tenant(true);
        let requests = vec![request(); MAX_BATCH_SIZE + 1];
        let result = handler.submit_batch("demo-key", requests).await;
        assert!(matches!(result, Err(HubError::Validation(_))));
    }
}
