//! The message record and its status DAG.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbound channel a message is delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    /// Generic HTTP SMS provider.
    Http,
    /// SMPP 3.4 telco connection.
    Smpp,
}

impl ChannelType {
    /// Parses a channel type case-insensitively, matching the router's
    /// dispatch behavior.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "HTTP" => Some(ChannelType::Http),
            "SMPP" => Some(ChannelType::Smpp),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelType::Http => write!(f, "HTTP"),
            ChannelType::Smpp => write!(f, "SMPP"),
        }
    }
}

/// A message's position in the delivery lifecycle.
///
/// Transitions form a DAG: `Queued -> Processing -> {Sent, Failed}`,
/// `Sent -> {Delivered, Failed}`. `Failed` and `Delivered` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    Queued,
    Processing,
    Sent,
    Delivered,
    Failed,
}

impl MessageStatus {
    /// Whether `self -> next` is a legal edge in the status DAG.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Queued, Processing)
                | (Processing, Sent)
                | (Processing, Failed)
                | (Sent, Delivered)
                | (Sent, Failed)
        )
    }

    /// Terminal statuses never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Delivered | MessageStatus::Failed)
    }
}

/// A message accepted for delivery, persisted by the repository and mutated
/// exclusively by the delivery worker and the SMPP DLR correlator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Identity, generated by the submission handler.
    pub id: Uuid,
    /// Tenant this message belongs to; scopes every read and write.
    pub subscription_key: String,
    /// Message body, 1-1600 chars at submission time.
    pub content: String,
    /// Destination address, 1-100 chars at submission time.
    pub recipient: String,
    /// Channel this message was routed to.
    pub channel_type: ChannelType,
    /// Current position in the status DAG.
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set on first transition into `Sent`; immutable thereafter.
    pub external_message_id: Option<String>,
    pub error_message: Option<String>,
    /// Incremented only by the delivery worker on transient-failure retries.
    pub retry_count: u32,
}

impl Message {
    /// Builds a freshly submitted message in the `Queued` state.
    pub fn new_queued(
        subscription_key: impl Into<String>,
        content: impl Into<String>,
        recipient: impl Into<String>,
        channel_type: ChannelType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            subscription_key: subscription_key.into(),
            content: content.into(),
            recipient: recipient.into(),
            channel_type,
            status: MessageStatus::Queued,
            created_at: now,
            updated_at: now,
            external_message_id: None,
            error_message: None,
            retry_count: 0,
        }
    }
}

/// Event published to the queue transport once a message has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageQueuedEvent {
    pub message_id: Uuid,
    pub subscription_key: String,
    pub content: String,
    pub recipient: String,
    pub channel_type: ChannelType,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageQueuedEvent {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id,
            subscription_key: message.subscription_key.clone(),
            content: message.content.clone(),
            recipient: message.recipient.clone(),
            channel_type: message.channel_type,
            created_at: message.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_type_parses_case_insensitively() {
        assert_eq!(ChannelType::parse("http"), Some(ChannelType::Http));
        assert_eq!(ChannelType::parse("Smpp"), Some(ChannelType::Smpp));
        assert_eq!(ChannelType::parse("carrier-pigeon"), None);
    }

    #[test]
    fn status_dag_allows_only_documented_edges() {
        use MessageStatus::*;
        assert!(Queued.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Sent));
        assert!(Processing.can_transition_to(Failed));
        assert!(Sent.can_transition_to(Delivered));
        assert!(Sent.can_transition_to(Failed));

        assert!(!Queued.can_transition_to(Sent));
        assert!(!Delivered.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Queued));
    }

    #[test]
    fn terminal_statuses() {
        assert!(MessageStatus::Delivered.is_terminal());
        assert!(MessageStatus::Failed.is_terminal());
        assert!(!MessageStatus::Sent.is_terminal());
    }
}
