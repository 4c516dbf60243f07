//! Request/response bodies for the five endpoints in `SPEC_FULL.md` §6.

use chrono::{DateTime, Utc};
use message_hub_core::{BatchItemResult, BatchResult, SubmitResult};
use message_hub_domain::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageRequest {
    pub recipient: String,
    pub message: String,
    pub channel_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageResponse {
    pub message_id: Uuid,
    pub status: String,
    pub status_url: String,
}

impl From<SubmitResult> for SubmitMessageResponse {
    fn from(result: SubmitResult) -> Self {
        Self {
            message_id: result.message_id,
            status: status_name(result.status),
            status_url: result.status_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitBatchRequest {
    pub messages: Vec<SubmitMessageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    pub status: String,
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<BatchItemResult> for BatchItemResponse {
    fn from(item: BatchItemResult) -> Self {
        Self {
            message_id: item.message_id,
            status: status_name(item.status),
            recipient: item.recipient,
            error_message: item.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBatchResponse {
    pub results: Vec<BatchItemResponse>,
    pub status_url_pattern: String,
    pub total_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
}

impl From<BatchResult> for SubmitBatchResponse {
    fn from(result: BatchResult) -> Self {
        Self {
            results: result.items.into_iter().map(BatchItemResponse::from).collect(),
            status_url_pattern: "/api/messages/{messageId}/status".to_string(),
            total_count: result.total_count,
            success_count: result.success_count,
            failed_count: result.failed_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatusResponse {
    pub message_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub recipient: String,
    pub channel_type: String,
}

impl From<Message> for MessageStatusResponse {
    fn from(message: Message) -> Self {
        Self {
            message_id: message.id,
            status: status_name(message.status),
            created_at: message.created_at,
            updated_at: message.updated_at,
            external_message_id: message.external_message_id,
            error_message: message.error_message,
            retry_count: message.retry_count,
            recipient: message.recipient,
            channel_type: message.channel_type.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub status: Option<String>,
}

fn status_name(status: message_hub_domain::MessageStatus) -> String {
    use message_hub_domain::MessageStatus::*;
    match status {
        Queued => "Queued",
        Processing => "Processing",
        Sent => "Sent",
        Delivered => "Delivered",
        Failed => "Failed",
    }
    .to_string()
}
