//! An in-memory repository backing tests and local development. Not
//! durable across restarts.

use crate::{ListFilter, MessageRepository, RepositoryError};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use message_hub_domain::{Message, MessageStatus};
use uuid::Uuid;

/// Concurrent map keyed by message id; tenant scoping is applied at read
/// time by filtering on `subscription_key`.
#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: DashMap<Uuid, Message>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: Message) -> Result<(), RepositoryError> {
        self.messages.insert(message.id, message);
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: MessageStatus,
        external_message_id: Option<String>,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError> {
        let mut entry = self
            .messages
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        entry.status = status;
        if entry.external_message_id.is_none() {
            if let Some(ext) = external_message_id {
                entry.external_message_id = Some(ext);
            }
        }
        if error_message.is_some() {
            entry.error_message = error_message;
        }
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn get_by_id_for_tenant(
        &self,
        id: Uuid,
        tenant_key: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .messages
            .get(&id)
            .filter(|m| m.subscription_key == tenant_key)
            .map(|m| m.clone()))
    }

    async fn increment_retry_count(&self, id: Uuid) -> Result<u32, RepositoryError> {
        let mut entry = self
            .messages
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        entry.retry_count += 1;
        entry.updated_at = Utc::now();
        Ok(entry.retry_count)
    }

    async fn list_for_tenant(
        &self,
        tenant_key: &str,
        filter: ListFilter,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|entry| entry.subscription_key == tenant_key)
            .filter(|entry| match filter.status {
                Some(s) => entry.status == s,
                None => true,
            })
            .map(|entry| entry.clone())
            .collect();

        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let limit = if filter.limit == 0 { 100 } else { filter.limit };
        messages.truncate(limit.min(100));
        Ok(messages)
    }
}
