//! At-least-once publish/subscribe of [`MessageQueuedEvent`]s.
//!
//! The transport is a pluggable boundary ([`QueueTransport`]): production
//! deployments point it at a durable broker, local/dev runs use
//! [`InProcessQueueTransport`]. Ordering is per-tenant best-effort only —
//! the repository remains the source of truth for message state.

mod dead_letter;
mod error;
mod in_process;

pub use dead_letter::{DeadLetterEntry, DeadLetterHook, DeadLetterSink};
pub use error::QueueError;
pub use in_process::InProcessQueueTransport;

use async_trait::async_trait;
use futures::future::BoxFuture;
use message_hub_domain::MessageQueuedEvent;
use std::sync::Arc;

/// Outcome of a single handler invocation, used to decide whether the
/// transport should redeliver the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Processed successfully; do not redeliver.
    Processed,
    /// Failed transiently; redeliver subject to the transport's bound.
    Retry,
    /// Failed permanently; do not redeliver, route straight to dead-letter.
    Drop,
}

/// A consumer callback invoked for every delivered event.
pub type QueueHandler =
    Arc<dyn Fn(MessageQueuedEvent) -> BoxFuture<'static, HandlerOutcome> + Send + Sync>;

/// Publish/subscribe boundary for [`MessageQueuedEvent`]s.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn publish(&self, event: MessageQueuedEvent) -> Result<(), QueueError>;

    /// Registers the single consumer for this transport and starts
    /// delivering. Only one subscriber is supported, matching the single
    /// consumer-group design in `SPEC_FULL.md` §6.
    fn subscribe(&self, handler: QueueHandler);
}
