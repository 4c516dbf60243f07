//! Consumes `MessageQueuedEvent`s, routes each to its channel, and applies
//! the resulting status transition. Transient failures are left for the
//! queue transport to redeliver; permanent failures terminate the message.

use crate::config::HubConfig;
use crate::router::ChannelRouter;
use message_hub_domain::{HubError, MessageQueuedEvent, MessageStatus};
use message_hub_queue::HandlerOutcome;
use message_hub_repository::MessageRepository;
use std::sync::Arc;

pub struct DeliveryWorker {
    config: Arc<HubConfig>,
    repository: Arc<dyn MessageRepository>,
    router: Arc<ChannelRouter>,
}

impl DeliveryWorker {
    pub fn new(config: Arc<HubConfig>, repository: Arc<dyn MessageRepository>, router: Arc<ChannelRouter>) -> Self {
        Self { config, repository, router }
    }

    /// Handles one delivery attempt for `event`, returning the outcome the
    /// queue transport should act on.
    pub async fn handle(&self, event: MessageQueuedEvent) -> HandlerOutcome {
        match self.try_handle(&event).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn_delivery_errored(event.message_id, &err);
                if let Err(fail_err) = self.fail(&event, &err).await {
                    warn_delivery_errored(event.message_id, &fail_err);
                }
                HandlerOutcome::Drop
            }
        }
    }

    async fn try_handle(&self, event: &MessageQueuedEvent) -> Result<HandlerOutcome, HubError> {
        self.repository
            .update_status(event.message_id, MessageStatus::Processing, None, None)
            .await
            .map_err(|e| HubError::Repository(e.to_string()))?;

        let tenant = self
            .config
            .tenant(&event.subscription_key)
            .ok_or_else(|| HubError::UnknownTenant(event.subscription_key.clone()))?;

        let max_retries = match event.channel_type {
            message_hub_domain::ChannelType::Http => {
                tenant.http.as_ref().map(|c| c.max_retries as u32).unwrap_or(0)
            }
            message_hub_domain::ChannelType::Smpp => tenant
                .smpp
                .as_ref()
                .map(|c| c.failed_message.max_retries)
                .unwrap_or(0),
        };

        let result = self
            .router
            .send(
                event.channel_type,
                tenant,
                event.message_id,
                &event.recipient,
                &event.content,
            )
            .await;

        match result {
            Ok(outcome) => {
                self.repository
                    .update_status(
                        event.message_id,
                        MessageStatus::Sent,
                        outcome.external_message_id,
                        None,
                    )
                    .await
                    .map_err(|e| HubError::Repository(e.to_string()))?;
                Ok(HandlerOutcome::Processed)
            }
            Err(err) if err.is_transient() => {
                warn_transient_failure(event.message_id, &err);
                let attempts = self
                    .repository
                    .increment_retry_count(event.message_id)
                    .await
                    .map_err(|e| HubError::Repository(e.to_string()))?;
                if attempts > max_retries {
                    self.fail(event, &err).await?;
                    Ok(HandlerOutcome::Drop)
                } else {
                    Ok(HandlerOutcome::Retry)
                }
            }
            Err(err) => {
                self.fail(event, &err).await?;
                Ok(HandlerOutcome::Drop)
            }
        }
    }

    async fn fail(&self, event: &MessageQueuedEvent, err: &HubError) -> Result<(), HubError> {
        self.repository
            .update_status(event.message_id, MessageStatus::Failed, None, Some(err.to_string()))
            .await
            .map_err(|e| HubError::Repository(e.to_string()))
    }
}

fn warn_delivery_errored(message_id: uuid::Uuid, error: &HubError) {
    #[cfg(feature = "tracing")]
    tracing::error!(%message_id, %error, "delivery attempt errored");
    #[cfg(not(feature = "tracing"))]
    let _ = (message_id, error);
}

fn warn_transient_failure(message_id: uuid::Uuid, error: &HubError) {
    #[cfg(feature = "tracing")]
    tracing::warn!(%message_id, %error, "transient send failure");
    #[cfg(not(feature = "tracing"))]
    let _ = (message_id, error);
}
